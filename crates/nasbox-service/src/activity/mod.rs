//! Activity log recording and listing.

pub mod recorder;

pub use recorder::{ActivityListRequest, ActivityRecorder};
