//! Social feed endpoints

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chronicle_common::db::FeedPost;
use serde_json::{json, Value};

use super::{parse_json, IdPath};
use crate::context::RequestContext;
use crate::db::feed::FeedPostView;
use crate::error::ApiResult;
use crate::services::feed::{self, LikeState, NewPost};
use crate::{db, AppState};

/// GET /api/feed
pub async fn list_feed(State(state): State<AppState>) -> ApiResult<Json<Vec<FeedPostView>>> {
    Ok(Json(db::feed::list_posts(&state.db).await?))
}

/// POST /api/feed
pub async fn create_post(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<FeedPost>)> {
    context.require_user()?;
    let new_post: NewPost = parse_json(&body)?;
    let post = feed::create_post(&state.db, &context, new_post).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/feed/saved
pub async fn saved_posts(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Json<Vec<FeedPostView>>> {
    let user = context.require_user()?;
    Ok(Json(db::feed::saved_posts(&state.db, user.id).await?))
}

/// POST /api/feed/:id/like
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    IdPath(id): IdPath,
) -> ApiResult<Json<LikeState>> {
    Ok(Json(feed::toggle_like(&state.db, &context, id).await?))
}

/// POST /api/feed/:id/save
pub async fn save_post(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    IdPath(id): IdPath,
) -> ApiResult<Json<Value>> {
    feed::save(&state.db, &context, id).await?;
    Ok(Json(json!({ "saved": true })))
}
