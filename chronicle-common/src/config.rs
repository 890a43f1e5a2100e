//! Bootstrap configuration loading
//!
//! Configuration sources, highest priority first:
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables (`CHRONICLE_CONFIG`, secrets)
//! 3. TOML configuration file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: a warning is logged and compiled
//! defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CHRONICLE_CONFIG";
/// Environment variable overriding `billing.secret_key`
pub const BILLING_SECRET_ENV_VAR: &str = "CHRONICLE_BILLING_SECRET_KEY";
/// Environment variable overriding `billing.webhook_secret`
pub const WEBHOOK_SECRET_ENV_VAR: &str = "CHRONICLE_WEBHOOK_SECRET";
/// Environment variable overriding `billing.price_id`
pub const PRICE_ID_ENV_VAR: &str = "CHRONICLE_PRICE_ID";

/// Bootstrap configuration loaded from TOML file
///
/// Cannot change while running; restart to pick up edits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Path to SQLite database file (compiled default when absent)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Billing processor settings
    #[serde(default)]
    pub billing: BillingConfig,

    /// Session cookie settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Administrative access
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Base URL of the billing API
    #[serde(default = "default_billing_api_base")]
    pub api_base: String,
    /// Secret API key (prefer the environment variable)
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Shared secret used to verify webhook signatures
    #[serde(default)]
    pub webhook_secret: Option<String>,
    /// Price identifier of the premium plan
    #[serde(default = "default_price_id")]
    pub price_id: String,
    /// Accepted webhook timestamp skew in seconds
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            api_base: default_billing_api_base(),
            secret_key: None,
            webhook_secret: None,
            price_id: default_price_id(),
            webhook_tolerance_secs: default_webhook_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in hours
    #[serde(default = "default_session_ttl_hours")]
    pub ttl_hours: i64,
    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_session_ttl_hours(),
            secure_cookie: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Usernames allowed to create lessons
    #[serde(default)]
    pub usernames: Vec<String>,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5800
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_billing_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_price_id() -> String {
    "price_H5ggYwtDq4fbrJ".to_string()
}

fn default_webhook_tolerance() -> i64 {
    crate::api::signature::DEFAULT_TOLERANCE_SECS
}

/// Session lifetime when none is configured
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 30;

fn default_session_ttl_hours() -> i64 {
    DEFAULT_SESSION_TTL_HOURS
}

impl TomlConfig {
    /// Database path from config, or the compiled default
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }

    /// Apply environment overrides for secrets (ENV beats TOML)
    pub fn apply_env_overrides(&mut self) {
        self.billing.secret_key =
            resolve_secret(BILLING_SECRET_ENV_VAR, self.billing.secret_key.take());
        self.billing.webhook_secret =
            resolve_secret(WEBHOOK_SECRET_ENV_VAR, self.billing.webhook_secret.take());
        if let Some(price) = resolve_secret(PRICE_ID_ENV_VAR, None) {
            self.billing.price_id = price;
        }
    }
}

/// Locate the configuration file
///
/// Priority: explicit path > `CHRONICLE_CONFIG` > user config dir >
/// `/etc/chronicle/config.toml` (Linux only). Returns `None` when no
/// candidate exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("chronicle").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/chronicle/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolve and load configuration with graceful degradation
///
/// An explicitly named file that is missing or malformed is an error; an
/// absent default file falls back to compiled defaults.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let mut config = match resolve_config_path(cli_arg) {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            load_toml_config(&path)?
        }
        Some(path) => {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        None => {
            warn!("No configuration file found, using compiled defaults");
            TomlConfig::default()
        }
    };

    config.apply_env_overrides();
    Ok(config)
}

/// Resolve a secret from ENV then TOML
///
/// Empty or whitespace-only values are treated as absent.
pub fn resolve_secret(env_var: &str, toml_value: Option<String>) -> Option<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_secret(v));
    let toml_value = toml_value.filter(|v| is_valid_secret(v));

    match (env_value, toml_value) {
        (Some(env), Some(_)) => {
            warn!(
                "{} set in both environment and TOML. Using environment.",
                env_var
            );
            Some(env)
        }
        (Some(env), None) => Some(env),
        (None, toml) => toml,
    }
}

/// Non-empty, non-whitespace
pub fn is_valid_secret(value: &str) -> bool {
    !value.trim().is_empty()
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("chronicle"))
        .unwrap_or_else(|| PathBuf::from("./chronicle_data"))
        .join("chronicle.db")
}
