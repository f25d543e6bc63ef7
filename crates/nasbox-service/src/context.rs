//! Request context carrying the authenticated identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use nasbox_core::error::AppError;
use nasbox_core::result::AppResult;
use nasbox_entity::user::UserRole;

/// Context for the current authenticated request.
///
/// Supplied by the caller's session layer and trusted as-is. Every
/// service method takes one so that each operation knows *who* is acting
/// and whose storage it touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID.
    pub user_id: Uuid,
    /// The user's role.
    pub role: UserRole,
    /// The username, when known.
    pub username: Option<String>,
    /// IP address of the request origin.
    pub ip_address: Option<String>,
    /// User-Agent header value.
    pub user_agent: Option<String>,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a context for `user_id` acting with `role`.
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self {
            user_id,
            role,
            username: None,
            ip_address: None,
            user_agent: None,
            request_time: Utc::now(),
        }
    }

    /// Context for maintenance tasks run by an operator rather than a user.
    pub fn system() -> Self {
        Self::new(Uuid::nil(), UserRole::Admin).with_username("system")
    }

    /// Attach a username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Attach client details recorded in the activity log.
    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    /// Returns whether the current user is an admin.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Fails with `Unauthorized` unless the current user is an admin.
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::unauthorized("Administrator role required"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_admin() {
        let user = RequestContext::new(Uuid::new_v4(), UserRole::User);
        assert!(user.require_admin().is_err());
        assert!(RequestContext::system().require_admin().is_ok());
    }
}
