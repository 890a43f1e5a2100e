//! Session resolution middleware and cookie helpers
//!
//! The token comes from `Authorization: Bearer <token>` or the
//! `chronicle_session` cookie. Unknown or expired tokens yield an
//! anonymous context; endpoints that need a user reject it themselves.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use tracing::debug;

use crate::context::RequestContext;
use crate::db;
use crate::error::ApiError;
use crate::AppState;

pub const SESSION_COOKIE: &str = "chronicle_session";

/// Token presented with the request, bearer header first
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Attach a [`RequestContext`] to every request
pub async fn resolve_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = match session_token(request.headers()) {
        Some(token) => match db::sessions::find_active_user(&state.db, &token, Utc::now()).await? {
            Some(user) => RequestContext::authenticated(user, token),
            None => {
                debug!("Unknown or expired session token");
                RequestContext::anonymous()
            }
        },
        None => RequestContext::anonymous(),
    };

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// `Set-Cookie` value carrying a new session
pub fn session_cookie(token: &str, ttl: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        ttl.num_seconds()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", Duration::zero(), secure)
}
