//! Runtime settings derived from the bootstrap configuration

use chrono::Duration;
use chronicle_common::api::DEFAULT_TOLERANCE_SECS;
use chronicle_common::config::{TomlConfig, DEFAULT_SESSION_TTL_HOURS};
use chronicle_common::{Error, Result};

/// Longest accepted session lifetime (ten years)
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

/// Settings handlers read on every request
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Shared secret for billing webhook signatures; `None` rejects all webhooks
    pub webhook_secret: Option<String>,
    /// Accepted webhook timestamp skew in seconds
    pub webhook_tolerance_secs: i64,
    /// Session lifetime
    pub session_ttl: Duration,
    /// Mark the session cookie `Secure`
    pub secure_cookie: bool,
    /// Usernames allowed to create lessons
    pub admin_usernames: Vec<String>,
}

impl ServerSettings {
    /// Rejects a session lifetime outside `1..=MAX_SESSION_TTL_HOURS`
    pub fn from_config(config: &TomlConfig) -> Result<Self> {
        let ttl_hours = config.session.ttl_hours;
        let session_ttl = Some(ttl_hours)
            .filter(|hours| (1..=MAX_SESSION_TTL_HOURS).contains(hours))
            .and_then(Duration::try_hours)
            .ok_or_else(|| {
                Error::Config(format!(
                    "session.ttl_hours must be between 1 and {}, got {}",
                    MAX_SESSION_TTL_HOURS, ttl_hours
                ))
            })?;

        Ok(Self {
            webhook_secret: config.billing.webhook_secret.clone(),
            webhook_tolerance_secs: config.billing.webhook_tolerance_secs,
            session_ttl,
            secure_cookie: config.session.secure_cookie,
            admin_usernames: config.admin.usernames.clone(),
        })
    }

    pub fn is_admin(&self, username: &str) -> bool {
        self.admin_usernames.iter().any(|name| name == username)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            webhook_secret: None,
            webhook_tolerance_secs: DEFAULT_TOLERANCE_SECS,
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            secure_cookie: false,
            admin_usernames: Vec::new(),
        }
    }
}
