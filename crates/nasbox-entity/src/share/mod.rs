//! Share capability entity.

pub mod model;

pub use model::{NewShare, ShareRecord, ShareState, ShareTarget};
