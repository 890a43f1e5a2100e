//! Processed billing notification ledger

use chrono::{DateTime, Utc};
use chronicle_common::Result;
use sqlx::{Executor, Sqlite};

/// Outcome placeholder until the reconciler finishes
pub const PENDING_OUTCOME: &str = "pending";

/// Claim an event id; `false` when it was processed before
pub async fn claim_event<'e, E>(
    executor: E,
    event_id: &str,
    event_type: &str,
    user_id: Option<i64>,
    received_at: DateTime<Utc>,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO billing_events (event_id, event_type, user_id, outcome, received_at) \
         VALUES (?, ?, ?, ?, ?) ON CONFLICT(event_id) DO NOTHING",
    )
    .bind(event_id)
    .bind(event_type)
    .bind(user_id)
    .bind(PENDING_OUTCOME)
    .bind(received_at)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_outcome<'e, E>(executor: E, event_id: &str, outcome: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE billing_events SET outcome = ? WHERE event_id = ?")
        .bind(outcome)
        .bind(event_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Recorded outcome for an event id
pub async fn outcome_of<'e, E>(executor: E, event_id: &str) -> Result<Option<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let outcome: Option<String> = sqlx::query_scalar("SELECT outcome FROM billing_events WHERE event_id = ?")
        .bind(event_id)
        .fetch_optional(executor)
        .await?;
    Ok(outcome)
}
