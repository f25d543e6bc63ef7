//! File and folder operations over a user's storage tree.

pub mod listing;
pub mod search;
pub mod service;

pub use listing::{FileContent, ListEntry};
pub use search::{SearchRequest, SearchService};
pub use service::FileOperationsService;
