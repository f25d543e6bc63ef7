//! Folder metadata record.

pub mod model;

pub use model::{FolderRecord, NewFolderRecord};
