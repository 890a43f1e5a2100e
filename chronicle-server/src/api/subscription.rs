//! Subscription initiation and billing webhook
//!
//! The webhook authenticates by signature only; it sits outside the
//! session middleware.

use axum::{body::Bytes, extract::State, http::HeaderMap, Extension, Json};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use crate::context::RequestContext;
use crate::error::ApiResult;
use crate::services::billing::{self, SubscriptionIntent};
use crate::services::reconciler;
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /api/create-subscription
pub async fn create_subscription(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Json<SubscriptionIntent>> {
    let user = context.require_user()?;
    let intent = billing::start_subscription(&state.db, state.billing.as_ref(), user).await?;
    Ok(Json(intent))
}

/// POST /api/webhook
pub async fn billing_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let event = reconciler::verify_event(
        &body,
        signature,
        state.settings.webhook_secret.as_deref(),
        state.settings.webhook_tolerance_secs,
        Utc::now().timestamp(),
    )
    .map_err(|err| {
        warn!("Rejected billing webhook: {}", err);
        err
    })?;

    let outcome = reconciler::reconcile(&state.db, &event).await?;
    Ok(Json(json!({ "received": true, "outcome": outcome.as_str() })))
}
