//! Unified application error types for NasBox.
//!
//! Every crate maps its internal failures into [`AppError`] so that a
//! presentation layer can always branch on a specific [`ErrorKind`].

use std::fmt;
use std::io;

use thiserror::Error;

/// Error categories surfaced to callers of the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A path escapes the owner root or is otherwise malformed.
    InvalidPath,
    /// The target file, folder, share or token does not exist.
    NotFound,
    /// A name collision on create, rename or move.
    AlreadyExists,
    /// The acting user does not own, or may not touch, the target.
    Unauthorized,
    /// The filesystem and the metadata store disagree after a mutation.
    Inconsistent,
    /// A share token exists but its expiry has passed.
    Expired,
    /// A password-protected share was resolved without a password.
    PasswordRequired,
    /// A password-protected share was resolved with the wrong password.
    PasswordInvalid,
    /// A directory operation was applied to something that is not a directory.
    NotADirectory,
    /// A rename would cross filesystem boundaries.
    CrossDevice,
    /// Input validation failed.
    Validation,
    /// The payload exceeds the configured upload limit.
    PayloadTooLarge,
    /// A storage I/O error occurred.
    Storage,
    /// A database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath => write!(f, "INVALID_PATH"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::AlreadyExists => write!(f, "ALREADY_EXISTS"),
            Self::Unauthorized => write!(f, "UNAUTHORIZED"),
            Self::Inconsistent => write!(f, "INCONSISTENT"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::PasswordRequired => write!(f, "PASSWORD_REQUIRED"),
            Self::PasswordInvalid => write!(f, "PASSWORD_INVALID"),
            Self::NotADirectory => write!(f, "NOT_A_DIRECTORY"),
            Self::CrossDevice => write!(f, "CROSS_DEVICE"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::PayloadTooLarge => write!(f, "PAYLOAD_TOO_LARGE"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout NasBox.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Map an I/O error onto the matching kind, keeping the cause.
    ///
    /// `context` should name the operation and the path involved.
    pub fn from_io(context: impl Into<String>, err: io::Error) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
            io::ErrorKind::DirectoryNotEmpty => ErrorKind::AlreadyExists,
            io::ErrorKind::NotADirectory => ErrorKind::NotADirectory,
            io::ErrorKind::CrossesDevices => ErrorKind::CrossDevice,
            io::ErrorKind::PermissionDenied => ErrorKind::Unauthorized,
            _ => ErrorKind::Storage,
        };
        Self::with_source(kind, context, err)
    }

    /// Create an invalid-path error.
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPath, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an already-exists error.
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Create an inconsistency error.
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Inconsistent, message)
    }

    /// Create an expired error.
    pub fn expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Expired, message)
    }

    /// Create a password-required error.
    pub fn password_required(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PasswordRequired, message)
    }

    /// Create a password-invalid error.
    pub fn password_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PasswordInvalid, message)
    }

    /// Create a not-a-directory error.
    pub fn not_a_directory(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotADirectory, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a payload-too-large error.
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PayloadTooLarge, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this error belongs to the given category.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        let context = format!("I/O error: {err}");
        Self::from_io(context, err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_screaming_kind() {
        let err = AppError::password_required("Share is password protected");
        assert_eq!(
            err.to_string(),
            "PASSWORD_REQUIRED: Share is password protected"
        );
    }

    #[test]
    fn test_io_kinds_are_mapped() {
        let missing = AppError::from(io::Error::from(io::ErrorKind::NotFound));
        assert!(missing.is(ErrorKind::NotFound));

        let taken = AppError::from_io("rename", io::Error::from(io::ErrorKind::AlreadyExists));
        assert!(taken.is(ErrorKind::AlreadyExists));

        let other = AppError::from(io::Error::other("disk on fire"));
        assert!(other.is(ErrorKind::Storage));
    }

    #[test]
    fn test_clone_drops_source() {
        let err = AppError::from_io("read", io::Error::from(io::ErrorKind::NotFound));
        let cloned = err.clone();
        assert_eq!(cloned.kind, ErrorKind::NotFound);
        assert!(cloned.source.is_none());
    }
}
