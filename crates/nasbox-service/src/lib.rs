//! # nasbox-service
//!
//! Business logic for NasBox. Each service orchestrates the path resolver,
//! the filesystem adapter, and the metadata stores to implement one group
//! of use cases.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references, and every entry point takes
//! an explicit [`RequestContext`] naming the acting user.

pub mod activity;
pub mod context;
pub mod file;
pub mod nas;
pub mod share;
pub mod storage;
pub mod user;

pub use activity::ActivityRecorder;
pub use context::RequestContext;
pub use file::{FileOperationsService, SearchService};
pub use nas::NasShareService;
pub use share::ShareManager;
pub use storage::StorageService;
pub use user::UserService;
