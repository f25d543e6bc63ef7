//! Argon2id password hashing and verification.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use tracing::debug;

use nasbox_core::error::AppError;
use nasbox_core::result::AppResult;
use nasbox_core::traits::CredentialHasher;

/// Hashes and verifies secrets using Argon2id with a random salt.
#[derive(Debug, Clone, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    /// Creates a new password hasher instance.
    pub fn new() -> Self {
        Self
    }

    /// Hashes a plaintext secret into a PHC string.
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

        Ok(hash.to_string())
    }

    /// Verifies a plaintext secret against a stored PHC string.
    ///
    /// Returns `Ok(false)` on mismatch. A digest that cannot be parsed is
    /// an error, not a mismatch.
    pub fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::internal(format!("Invalid password hash format: {e}")))?;

        let argon2 = Argon2::default();
        match argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                debug!("Password mismatch");
                Ok(false)
            }
            Err(e) => Err(AppError::internal(format!(
                "Password verification failed: {e}"
            ))),
        }
    }
}

impl CredentialHasher for PasswordHasher {
    fn hash(&self, plaintext: &str) -> AppResult<String> {
        self.hash_password(plaintext)
    }

    fn verify(&self, plaintext: &str, digest: &str) -> AppResult<bool> {
        self.verify_password(plaintext, digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hasher = PasswordHasher::new();
        let digest = hasher.hash_password("correct horse").unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(hasher.verify_password("correct horse", &digest).unwrap());
        assert!(!hasher.verify_password("battery staple", &digest).unwrap());
    }

    #[test]
    fn test_salts_differ() {
        let hasher = PasswordHasher::new();
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_digest_is_an_error() {
        let hasher = PasswordHasher::new();
        assert!(hasher.verify("x", "not-a-phc-string").is_err());
    }
}
