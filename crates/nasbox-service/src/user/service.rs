//! Admin user management: account creation and owner-root provisioning.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use nasbox_core::error::AppError;
use nasbox_core::result::AppResult;
use nasbox_core::traits::credential::CredentialHasher;
use nasbox_core::traits::storage::FilesystemAdapter;
use nasbox_database::store::UserStore;
use nasbox_entity::user::{NewUser, User, UserRole};
use nasbox_storage::PathResolver;

use crate::context::RequestContext;

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 8;

/// Request to create a new user.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CreateUserRequest {
    /// Email (unique).
    pub email: String,
    /// Username (unique).
    pub username: String,
    /// Initial password.
    pub password: String,
    /// Role assignment.
    pub role: UserRole,
}

/// Creates and looks up accounts.
#[derive(Debug, Clone)]
pub struct UserService {
    /// User rows.
    users: Arc<dyn UserStore>,
    /// Credential hasher.
    hasher: Arc<dyn CredentialHasher>,
    /// Owner-root layout.
    resolver: Arc<PathResolver>,
    /// Creates the owner root.
    fs: Arc<dyn FilesystemAdapter>,
}

impl UserService {
    /// Creates a new user service.
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn CredentialHasher>,
        resolver: Arc<PathResolver>,
        fs: Arc<dyn FilesystemAdapter>,
    ) -> Self {
        Self {
            users,
            hasher,
            resolver,
            fs,
        }
    }

    /// Creates an account and its owner root directory.
    pub async fn create(&self, ctx: &RequestContext, req: CreateUserRequest) -> AppResult<User> {
        ctx.require_admin()?;

        let username = req.username.trim();
        if username.is_empty() || username.contains(['/', '\\']) {
            return Err(AppError::validation("Username must be a non-empty single word"));
        }
        let email = req.email.trim();
        if !email.contains('@') {
            return Err(AppError::validation("Email address is invalid"));
        }
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = self.hasher.hash(&req.password)?;
        let user = self
            .users
            .create(&NewUser {
                email: email.to_string(),
                username: username.to_string(),
                role: req.role,
                password_hash,
            })
            .await?;

        self.fs
            .ensure_dir(&self.resolver.owner_root(user.id))
            .await?;

        info!(
            admin_id = %ctx.user_id,
            user_id = %user.id,
            username = %user.username,
            role = %user.role,
            "User created"
        );

        Ok(user)
    }

    /// Every account, oldest first.
    pub async fn list(&self, ctx: &RequestContext) -> AppResult<Vec<User>> {
        ctx.require_admin()?;
        self.users.list().await
    }

    /// Account by username.
    pub async fn find_by_username(&self, username: &str) -> AppResult<User> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User '{username}' not found")))
    }

    /// Account by id.
    pub async fn get(&self, id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nasbox_auth::PasswordHasher;
    use nasbox_core::error::ErrorKind;
    use nasbox_database::memory::MemoryUserStore;
    use nasbox_storage::LocalFilesystem;

    async fn service(root: &std::path::Path) -> (UserService, Arc<PathResolver>) {
        let resolver = Arc::new(PathResolver::new(root));
        let fs = LocalFilesystem::new(root.join(".nasbox-tmp")).await.unwrap();
        let service = UserService::new(
            Arc::new(MemoryUserStore::new()),
            Arc::new(PasswordHasher::new()),
            resolver.clone(),
            Arc::new(fs),
        );
        (service, resolver)
    }

    fn request(username: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            password: "correct horse".to_string(),
            role: UserRole::User,
        }
    }

    #[tokio::test]
    async fn test_create_provisions_owner_root() {
        let dir = tempfile::tempdir().unwrap();
        let (service, resolver) = service(dir.path()).await;

        let user = service
            .create(&RequestContext::system(), request("alice"))
            .await
            .unwrap();
        assert!(resolver.owner_root(user.id).is_dir());
        assert_ne!(user.password_hash, "correct horse");
        assert_eq!(service.find_by_username("alice").await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let dir = tempfile::tempdir().unwrap();
        let (service, _) = service(dir.path()).await;
        let ctx = RequestContext::system();

        let mut short = request("bob");
        short.password = "short".into();
        let err = service.create(&ctx, short).await.unwrap_err();
        assert!(err.is(ErrorKind::Validation));

        service.create(&ctx, request("bob")).await.unwrap();
        let err = service.create(&ctx, request("bob")).await.unwrap_err();
        assert!(err.is(ErrorKind::AlreadyExists));

        let user = RequestContext::new(Uuid::new_v4(), UserRole::User);
        let err = service.create(&user, request("carol")).await.unwrap_err();
        assert!(err.is(ErrorKind::Unauthorized));
    }
}
