//! # nasbox-core
//!
//! Core crate for NasBox. Contains the unified error system, configuration
//! schemas, the logical path rules shared by every layer, and the traits
//! implemented by the storage and auth crates.
//!
//! This crate has **no** internal dependencies on other NasBox crates.

pub mod config;
pub mod error;
pub mod path;
pub mod result;
pub mod traits;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
