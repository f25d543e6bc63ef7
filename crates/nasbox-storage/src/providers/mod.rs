//! Filesystem adapter implementations.

pub mod local;

pub use local::LocalFilesystem;
