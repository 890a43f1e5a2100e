//! Registration, login and logout

use chrono::Utc;
use chronicle_common::db::{Session, User};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::password;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::settings::ServerSettings;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 64;
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Registration rules; login skips them so old accounts still work
    pub fn validate_new(&self) -> ApiResult<()> {
        let username = self.username.trim();
        if username.len() < MIN_USERNAME_LEN || username.len() > MAX_USERNAME_LEN {
            return Err(ApiError::validation(
                "username",
                format!(
                    "Username must be {} to {} characters",
                    MIN_USERNAME_LEN, MAX_USERNAME_LEN
                ),
            ));
        }
        if username != self.username {
            return Err(ApiError::validation(
                "username",
                "Username must not start or end with whitespace",
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::validation(
                "password",
                format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }
        Ok(())
    }
}

/// Create an account and open its first session
pub async fn register(
    pool: &SqlitePool,
    settings: &ServerSettings,
    credentials: Credentials,
) -> ApiResult<(User, Session)> {
    credentials.validate_new()?;

    let hash = password::hash_password_async(credentials.password).await?;
    let now = Utc::now();

    let user = db::users::create_user(pool, &credentials.username, &hash, now)
        .await?
        .ok_or_else(|| ApiError::Conflict("Username already exists".to_string()))?;

    let session = db::sessions::create_session(pool, user.id, settings.session_ttl, now).await?;
    info!(user_id = user.id, username = %user.username, "Registered user");

    Ok((user, session))
}

/// Verify credentials and open a session
pub async fn login(
    pool: &SqlitePool,
    settings: &ServerSettings,
    credentials: Credentials,
) -> ApiResult<(User, Session)> {
    let Some(user) = db::users::find_by_username(pool, &credentials.username).await? else {
        debug!(username = %credentials.username, "Login for unknown username");
        return Err(ApiError::InvalidCredentials);
    };

    let valid =
        password::verify_password_async(credentials.password, user.password_hash.clone()).await?;
    if !valid {
        debug!(user_id = user.id, "Login with wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    let session =
        db::sessions::create_session(pool, user.id, settings.session_ttl, Utc::now()).await?;
    info!(user_id = user.id, "User logged in");

    Ok((user, session))
}

/// End a session; unknown tokens are ignored
pub async fn logout(pool: &SqlitePool, token: Option<&str>) -> ApiResult<()> {
    if let Some(token) = token {
        db::sessions::delete_session(pool, token).await?;
    }
    Ok(())
}
