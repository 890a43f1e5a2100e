//! Lesson progress queries
//!
//! The store enforces UNIQUE(user_id, lesson_id); inserts never create a
//! second row for a pair.

use chrono::{DateTime, Utc};
use chronicle_common::db::ProgressRecord;
use chronicle_common::Result;
use sqlx::{Executor, Sqlite};

pub async fn find_progress<'e, E>(
    executor: E,
    user_id: i64,
    lesson_id: i64,
) -> Result<Option<ProgressRecord>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let record = sqlx::query_as::<_, ProgressRecord>(
        "SELECT id, user_id, lesson_id, completed, last_attempted \
         FROM user_progress WHERE user_id = ? AND lesson_id = ?",
    )
    .bind(user_id)
    .bind(lesson_id)
    .fetch_optional(executor)
    .await?;
    Ok(record)
}

/// Insert a completed row unless one exists for the pair
///
/// Returns `true` when a row was created.
pub async fn insert_completed<'e, E>(
    executor: E,
    user_id: i64,
    lesson_id: i64,
    now: DateTime<Utc>,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO user_progress (user_id, lesson_id, completed, last_attempted) \
         VALUES (?, ?, 1, ?) \
         ON CONFLICT(user_id, lesson_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(lesson_id)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Mark an existing row completed and refresh its attempt time
pub async fn mark_completed<'e, E>(executor: E, id: i64, now: DateTime<Utc>) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE user_progress SET completed = 1, last_attempted = ? WHERE id = ?")
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}
