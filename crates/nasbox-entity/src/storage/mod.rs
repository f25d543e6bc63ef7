//! Disk usage value objects.

pub mod usage;

pub use usage::{Capacity, DiskUsage};
