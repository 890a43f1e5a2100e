//! Subscription-state reconciler
//!
//! Applies verified billing notifications to `users.is_subscribed`.
//!
//! Each event id is claimed in `billing_events` inside the same transaction
//! as the state write, so a redelivered event is a no-op. Each user carries
//! the event time of the last applied change; older events are stale. At an
//! equal event time an unsubscribe still applies while an activation does
//! not override a deletion.

use chrono::Utc;
use chronicle_common::api::verify_signature;
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::db;
use crate::error::{ApiError, ApiResult};

pub const SUBSCRIPTION_CREATED: &str = "customer.subscription.created";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

/// Billing status that grants entitlement
pub const ACTIVE_STATUS: &str = "active";

/// Billing notification envelope
#[derive(Debug, Clone, Deserialize)]
pub struct BillingEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event creation time, unix seconds
    pub created: i64,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Subscribed,
    Unsubscribed,
}

impl SubscriptionState {
    pub fn is_subscribed(self) -> bool {
        matches!(self, SubscriptionState::Subscribed)
    }
}

/// State change an event asks for, plus the raw status to record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: SubscriptionState,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied(SubscriptionState),
    /// Event id seen before
    Duplicate,
    /// Older than the user's watermark
    Stale,
    UnknownUser,
    /// Event type or payload not relevant to entitlement
    Ignored,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Applied(SubscriptionState::Subscribed) => "subscribed",
            ReconcileOutcome::Applied(SubscriptionState::Unsubscribed) => "unsubscribed",
            ReconcileOutcome::Duplicate => "duplicate",
            ReconcileOutcome::Stale => "stale",
            ReconcileOutcome::UnknownUser => "unknown_user",
            ReconcileOutcome::Ignored => "ignored",
        }
    }
}

/// Map an event to the state it requests; `None` for unrelated types
pub fn target_state(event: &BillingEvent) -> Option<Transition> {
    match event.event_type.as_str() {
        SUBSCRIPTION_CREATED | SUBSCRIPTION_UPDATED => {
            let status = event
                .data
                .object
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let state = if status == ACTIVE_STATUS {
                SubscriptionState::Subscribed
            } else {
                SubscriptionState::Unsubscribed
            };
            Some(Transition { state, status })
        }
        SUBSCRIPTION_DELETED => Some(Transition {
            state: SubscriptionState::Unsubscribed,
            status: db::users::DELETED_STATUS.to_string(),
        }),
        _ => None,
    }
}

/// `metadata.userId` of the event object, as a string or a number
pub fn user_id_of(object: &Value) -> Option<i64> {
    match object.get("metadata")?.get("userId")? {
        Value::String(raw) => raw.trim().parse().ok(),
        Value::Number(number) => number.as_i64(),
        _ => None,
    }
}

/// Authenticate a raw webhook body and parse it
///
/// Nothing is read from or written to the store here.
pub fn verify_event(
    payload: &[u8],
    signature_header: Option<&str>,
    secret: Option<&str>,
    tolerance_secs: i64,
    now: i64,
) -> ApiResult<BillingEvent> {
    let (Some(header), Some(secret)) = (signature_header, secret) else {
        return Err(ApiError::InvalidSignature(
            "Missing signature or webhook secret".to_string(),
        ));
    };

    verify_signature(payload, header, secret, tolerance_secs, now)?;

    serde_json::from_slice(payload)
        .map_err(|e| ApiError::validation("body", format!("Malformed billing event: {}", e)))
}

/// Apply one verified event
pub async fn reconcile(pool: &SqlitePool, event: &BillingEvent) -> ApiResult<ReconcileOutcome> {
    let transition = target_state(event);
    let user_id = user_id_of(&event.data.object);

    let mut tx = pool.begin().await?;

    let claimed = db::billing_events::claim_event(
        &mut *tx,
        &event.id,
        &event.event_type,
        user_id,
        Utc::now(),
    )
    .await?;
    if !claimed {
        debug!(event_id = %event.id, "Billing event already processed");
        return Ok(ReconcileOutcome::Duplicate);
    }

    let outcome = match (transition, user_id) {
        (None, _) => {
            debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring billing event type");
            ReconcileOutcome::Ignored
        }
        (Some(_), None) => {
            warn!(event_id = %event.id, "Billing event without a usable metadata.userId");
            ReconcileOutcome::Ignored
        }
        (Some(transition), Some(user_id)) => {
            if !db::users::exists(&mut *tx, user_id).await? {
                warn!(event_id = %event.id, user_id, "Billing event for unknown user");
                ReconcileOutcome::UnknownUser
            } else {
                let changed = db::users::apply_subscription_state(
                    &mut *tx,
                    user_id,
                    transition.state.is_subscribed(),
                    &transition.status,
                    event.created,
                )
                .await?;
                if changed == 1 {
                    ReconcileOutcome::Applied(transition.state)
                } else {
                    ReconcileOutcome::Stale
                }
            }
        }
    };

    db::billing_events::set_outcome(&mut *tx, &event.id, outcome.as_str()).await?;
    tx.commit().await?;

    info!(
        event_id = %event.id,
        event_type = %event.event_type,
        outcome = outcome.as_str(),
        "Reconciled billing event"
    );

    Ok(outcome)
}
