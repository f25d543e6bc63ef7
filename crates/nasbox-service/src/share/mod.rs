//! Share capabilities over files and folders.

pub mod manager;
pub mod token;

pub use manager::{CreateShareRequest, ResolvedShare, ShareManager, ShareSummary, SharedContent};
