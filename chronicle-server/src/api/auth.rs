//! Registration, login, logout and current-user endpoints

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chronicle_common::db::User;
use serde_json::json;

use super::parse_json;
use super::session::{clear_session_cookie, session_cookie};
use crate::context::RequestContext;
use crate::error::ApiResult;
use crate::services::accounts::{self, Credentials};
use crate::AppState;

/// POST /api/register
pub async fn register(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let credentials: Credentials = parse_json(&body)?;
    let (user, session) = accounts::register(&state.db, &state.settings, credentials).await?;

    let cookie = session_cookie(
        &session.token,
        state.settings.session_ttl,
        state.settings.secure_cookie,
    );
    Ok((StatusCode::CREATED, [(header::SET_COOKIE, cookie)], Json(user)).into_response())
}

/// POST /api/login
pub async fn login(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let credentials: Credentials = parse_json(&body)?;
    let (user, session) = accounts::login(&state.db, &state.settings, credentials).await?;

    let cookie = session_cookie(
        &session.token,
        state.settings.session_ttl,
        state.settings.secure_cookie,
    );
    Ok(([(header::SET_COOKIE, cookie)], Json(user)).into_response())
}

/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Response> {
    accounts::logout(&state.db, context.session_token()).await?;

    let cookie = clear_session_cookie(state.settings.secure_cookie);
    Ok(([(header::SET_COOKIE, cookie)], Json(json!({ "success": true }))).into_response())
}

/// GET /api/user
pub async fn current_user(Extension(context): Extension<RequestContext>) -> ApiResult<Json<User>> {
    Ok(Json(context.require_user()?.clone()))
}
