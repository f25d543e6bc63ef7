//! # nasbox-auth
//!
//! Argon2id credential hashing used for user account passwords and
//! password-protected shares.

pub mod password;

pub use password::PasswordHasher;
