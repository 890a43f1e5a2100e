//! Session queries

use chrono::{DateTime, Duration, Utc};
use chronicle_common::db::{Session, User};
use chronicle_common::Result;
use rand::RngCore;
use sqlx::SqlitePool;
use tracing::debug;

use super::users;

/// Generate an opaque 256-bit session token
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Open a new session for a user
pub async fn create_session(
    pool: &SqlitePool,
    user_id: i64,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<Session> {
    let session = Session {
        token: generate_token(),
        user_id,
        created_at: now,
        expires_at: now + ttl,
    };

    sqlx::query(
        "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&session.token)
    .bind(session.user_id)
    .bind(session.created_at)
    .bind(session.expires_at)
    .execute(pool)
    .await?;

    Ok(session)
}

/// Resolve a token to its user
///
/// Expired sessions are deleted and resolve to `None`.
pub async fn find_active_user(
    pool: &SqlitePool,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<User>> {
    let session: Option<Session> = sqlx::query_as(
        "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    let Some(session) = session else {
        return Ok(None);
    };

    if session.expires_at <= now {
        debug!(user_id = session.user_id, "Session expired");
        delete_session(pool, token).await?;
        return Ok(None);
    }

    users::find_by_id(pool, session.user_id).await
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}
