//! # nasbox-storage
//!
//! Everything that touches the physical storage root: containment-checked
//! path resolution, the local filesystem adapter, recursive disk usage,
//! and the per-path lock table used by mutating operations.

pub mod lock;
pub mod mime;
pub mod providers;
pub mod resolver;
pub mod usage;

pub use lock::{PathGuard, PathLocks};
pub use providers::local::LocalFilesystem;
pub use resolver::{PathResolver, ResolvedPath};
pub use usage::DiskUsageCalculator;
