//! HTTP API handlers for chronicle-server

pub mod achievements;
pub mod auth;
pub mod feed;
pub mod health;
pub mod lessons;
pub mod session;
pub mod subscription;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};

pub use achievements::list_achievements;
pub use auth::{current_user, login, logout, register};
pub use feed::{create_post, list_feed, save_post, saved_posts, toggle_like};
pub use health::health_routes;
pub use lessons::{complete_lesson, create_lesson, get_lesson, list_lessons, recommended_lessons};
pub use session::resolve_context;
pub use subscription::{billing_webhook, create_subscription};

/// Decode a JSON body, reporting failures as validation errors
pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(ApiError::invalid_json)
}

/// Numeric `:id` path segment that rejects with the API error body
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::validation("id", rejection.body_text()))?;
        Ok(IdPath(id))
    }
}
