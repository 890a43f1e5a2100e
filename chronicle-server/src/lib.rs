//! chronicle-server library
//!
//! HTTP API for lessons, the social feed, lesson progress and premium
//! subscriptions. Exposed as a library so integration tests can build the
//! router against a temporary database.

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod context;
pub mod db;
pub mod error;
pub mod services;
pub mod settings;

pub use crate::context::RequestContext;
pub use crate::error::{ApiError, ApiResult};
pub use crate::settings::ServerSettings;

use crate::services::billing::BillingProvider;

/// Application state shared across HTTP handlers
///
/// Holds no per-user state; the authenticated principal travels in the
/// request's [`RequestContext`].
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Billing processor client
    pub billing: Arc<dyn BillingProvider>,
    /// Immutable runtime settings
    pub settings: Arc<ServerSettings>,
}

impl AppState {
    pub fn new(db: SqlitePool, billing: Arc<dyn BillingProvider>, settings: ServerSettings) -> Self {
        Self {
            db,
            billing,
            settings: Arc::new(settings),
        }
    }
}

/// Build application router
///
/// Session-aware routes run behind [`api::resolve_context`]. The billing
/// webhook authenticates by signature only and stays outside it.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let session_routes = Router::new()
        .route("/api/register", post(api::register))
        .route("/api/login", post(api::login))
        .route("/api/logout", post(api::logout))
        .route("/api/user", get(api::current_user))
        .route("/api/lessons", get(api::list_lessons).post(api::create_lesson))
        .route("/api/lessons/recommended", get(api::recommended_lessons))
        .route("/api/lessons/:id", get(api::get_lesson))
        .route("/api/lessons/:id/complete", post(api::complete_lesson))
        .route("/api/feed", get(api::list_feed).post(api::create_post))
        .route("/api/feed/saved", get(api::saved_posts))
        .route("/api/feed/:id/like", post(api::toggle_like))
        .route("/api/feed/:id/save", post(api::save_post))
        .route("/api/achievements", get(api::list_achievements))
        .route("/api/create-subscription", post(api::create_subscription))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::resolve_context,
        ));

    let public = Router::new()
        .route("/api/webhook", post(api::billing_webhook))
        .merge(api::health_routes());

    Router::new()
        .merge(session_routes)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
