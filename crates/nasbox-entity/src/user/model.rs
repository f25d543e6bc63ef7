//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::role::UserRole;

/// An account owning one storage root.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier; also names the owner root directory.
    pub id: Uuid,
    /// Email address (unique).
    pub email: String,
    /// Login name (unique).
    pub username: String,
    /// Role.
    pub role: UserRole,
    /// Opaque credential digest.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    /// Email address.
    pub email: String,
    /// Login name.
    pub username: String,
    /// Role.
    pub role: UserRole,
    /// Digest produced by the credential hasher.
    pub password_hash: String,
}
