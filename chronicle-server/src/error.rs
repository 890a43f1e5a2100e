//! Error types for chronicle-server
//!
//! Every failure is converted to an HTTP status and a JSON body at the
//! request boundary:
//!
//! ```json
//! { "error": { "code": "FORBIDDEN", "message": "...", "action": "subscribe" } }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chronicle_common::api::SignatureError;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::error;

use crate::services::billing::BillingError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// No signed-in user where one is mandatory (401)
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Login with unknown username or wrong password (401)
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Viewer lacks the entitlement or role (403)
    #[error("Forbidden: {message}")]
    Forbidden {
        message: String,
        /// Suggested user-visible remedy, e.g. `subscribe`
        action: Option<&'static str>,
    },

    /// Malformed request payload (400)
    #[error("Validation failed: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    /// Conflict (409), e.g. username taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Webhook signature missing or not verifiable (400)
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Billing processor rejected or failed a request (500)
    #[error("Billing error: {0}")]
    UpstreamBilling(String),

    /// Persistence failure (500)
    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),

    /// chronicle-common error
    #[error("Common error: {0}")]
    Common(#[from] chronicle_common::Error),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str, id: i64) -> Self {
        ApiError::NotFound(format!("{} {} not found", what, id))
    }

    /// Premium content without entitlement; the client offers a subscription
    pub fn premium_required() -> Self {
        ApiError::Forbidden {
            message: "Premium subscription required".to_string(),
            action: Some("subscribe"),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden {
            message: message.into(),
            action: None,
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Malformed JSON body; names the field when serde reports one
    pub fn invalid_json(err: serde_json::Error) -> Self {
        let message = err.to_string();
        ApiError::Validation {
            field: first_backticked(&message),
            message,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthenticationRequired | ApiError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::Validation { .. } | ApiError::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Common(chronicle_common::Error::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Common(chronicle_common::Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::UpstreamBilling(_)
            | ApiError::Store(_)
            | ApiError::Common(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Forbidden { .. } => "FORBIDDEN",
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InvalidSignature(_) => "INVALID_SIGNATURE",
            ApiError::UpstreamBilling(_) => "UPSTREAM_BILLING_ERROR",
            ApiError::Store(_) | ApiError::Common(chronicle_common::Error::Database(_)) => {
                "STORE_ERROR"
            }
            ApiError::Common(chronicle_common::Error::NotFound(_)) => "NOT_FOUND",
            ApiError::Common(chronicle_common::Error::InvalidInput(_)) => "VALIDATION_ERROR",
            ApiError::Common(_) | ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// First `quoted` token in a serde error message
fn first_backticked(message: &str) -> Option<String> {
    let start = message.find('`')? + 1;
    let len = message[start..].find('`')?;
    Some(message[start..start + len].to_string())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let mut body = Map::new();
        body.insert("code".to_string(), Value::from(self.code()));

        // Store details stay in the log
        let message = match &self {
            ApiError::Store(_) | ApiError::Common(chronicle_common::Error::Database(_)) => {
                "Database error".to_string()
            }
            ApiError::Forbidden { message, .. } | ApiError::Validation { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        };
        body.insert("message".to_string(), Value::from(message));

        match &self {
            ApiError::Forbidden {
                action: Some(action),
                ..
            } => {
                body.insert("action".to_string(), Value::from(*action));
            }
            ApiError::Validation {
                field: Some(field), ..
            } => {
                body.insert("field".to_string(), Value::from(field.clone()));
            }
            _ => {}
        }

        (status, Json(json!({ "error": body }))).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        ApiError::UpstreamBilling(err.to_string())
    }
}

impl From<SignatureError> for ApiError {
    fn from(err: SignatureError) -> Self {
        ApiError::InvalidSignature(err.to_string())
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
