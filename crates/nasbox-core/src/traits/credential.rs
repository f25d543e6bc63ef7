//! Opaque password hashing contract used for share passwords and
//! account credentials.

use crate::result::AppResult;

/// Hashes and verifies secrets without exposing the algorithm.
pub trait CredentialHasher: Send + Sync + std::fmt::Debug + 'static {
    /// Produce a self-describing digest for `plaintext`.
    fn hash(&self, plaintext: &str) -> AppResult<String>;

    /// Check `plaintext` against a digest produced by [`Self::hash`].
    ///
    /// Returns `Ok(false)` on a mismatch; errors are reserved for
    /// malformed digests and backend failures.
    fn verify(&self, plaintext: &str, digest: &str) -> AppResult<bool>;
}
