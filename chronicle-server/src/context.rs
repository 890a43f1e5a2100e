//! Request-scoped authentication context
//!
//! Resolved once per request by [`crate::api::resolve_context`] and passed
//! explicitly to every service that needs to know who is asking.

use chronicle_common::db::User;

use crate::error::ApiError;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    viewer: Option<User>,
    session_token: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: User, session_token: String) -> Self {
        Self {
            viewer: Some(user),
            session_token: Some(session_token),
        }
    }

    /// Signed-in user, if any
    pub fn viewer(&self) -> Option<&User> {
        self.viewer.as_ref()
    }

    /// Signed-in user, or `AuthenticationRequired`
    pub fn require_user(&self) -> Result<&User, ApiError> {
        self.viewer.as_ref().ok_or(ApiError::AuthenticationRequired)
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}
