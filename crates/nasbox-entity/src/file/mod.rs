//! File metadata record.

pub mod model;

pub use model::{FileRecord, NewFileRecord};
