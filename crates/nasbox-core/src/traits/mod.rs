//! Core traits defined in `nasbox-core` and implemented by other crates.

pub mod credential;
pub mod storage;

pub use credential::CredentialHasher;
pub use storage::{ByteStream, FilesystemAdapter, FsEntry, FsStat};
