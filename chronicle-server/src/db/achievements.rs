//! Achievement log (append-only)

use chrono::{DateTime, Utc};
use chronicle_common::db::Achievement;
use chronicle_common::Result;
use serde_json::Value;
use sqlx::{Executor, Sqlite};

pub async fn append_achievement<'e, E>(
    executor: E,
    user_id: i64,
    kind: &str,
    details: &Value,
    awarded_at: DateTime<Utc>,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO achievements (user_id, kind, details, awarded_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(kind)
    .bind(details.to_string())
    .bind(awarded_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// A user's achievements, newest first
pub async fn list_for_user<'e, E>(executor: E, user_id: i64) -> Result<Vec<Achievement>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let achievements = sqlx::query_as::<_, Achievement>(
        "SELECT id, user_id, kind, details, awarded_at FROM achievements \
         WHERE user_id = ? ORDER BY awarded_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await?;
    Ok(achievements)
}
