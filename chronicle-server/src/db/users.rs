//! User queries

use chrono::{DateTime, Utc};
use chronicle_common::db::User;
use chronicle_common::Result;
use sqlx::{Executor, Sqlite};

const USER_COLUMNS: &str = "id, username, password_hash, is_subscribed, subscription_status, \
     subscription_event_at, billing_customer_id, billing_subscription_id, created_at";

/// Insert a user; `None` when the username is already taken
pub async fn create_user<'e, E>(
    executor: E,
    username: &str,
    password_hash: &str,
    created_at: DateTime<Utc>,
) -> Result<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "INSERT INTO users (username, password_hash, is_subscribed, created_at) \
         VALUES (?, ?, 0, ?) ON CONFLICT(username) DO NOTHING RETURNING {}",
        USER_COLUMNS
    );

    let user = sqlx::query_as::<_, User>(&sql)
        .bind(username)
        .bind(password_hash)
        .bind(created_at)
        .fetch_optional(executor)
        .await?;

    Ok(user)
}

pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(user)
}

pub async fn find_by_username<'e, E>(executor: E, username: &str) -> Result<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(username)
        .fetch_optional(executor)
        .await?;
    Ok(user)
}

/// Remember the billing-side customer created for a user
pub async fn set_billing_customer<'e, E>(executor: E, user_id: i64, customer_id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE users SET billing_customer_id = ? WHERE id = ?")
        .bind(customer_id)
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn set_billing_subscription<'e, E>(
    executor: E,
    user_id: i64,
    subscription_id: &str,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE users SET billing_subscription_id = ? WHERE id = ?")
        .bind(subscription_id)
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Status recorded for a deleted subscription
pub const DELETED_STATUS: &str = "deleted";

/// Write the subscription flag unless the event is older than the watermark
///
/// At an equal event time the write is applied when it unsubscribes, or
/// when the stored state does not come from a deletion. Returns the
/// number of rows changed (0 when stale or the user does not exist).
pub async fn apply_subscription_state<'e, E>(
    executor: E,
    user_id: i64,
    subscribed: bool,
    status: &str,
    event_at: i64,
) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET is_subscribed = ?1,
            subscription_status = ?2,
            subscription_event_at = ?3
        WHERE id = ?4
          AND (
              subscription_event_at IS NULL
              OR subscription_event_at < ?3
              OR (subscription_event_at = ?3
                  AND (?1 = 0 OR subscription_status IS NOT ?5))
          )
        "#,
    )
    .bind(subscribed)
    .bind(status)
    .bind(event_at)
    .bind(user_id)
    .bind(DELETED_STATUS)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

pub async fn exists<'e, E>(executor: E, user_id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
        .bind(user_id)
        .fetch_one(executor)
        .await?;
    Ok(exists)
}
