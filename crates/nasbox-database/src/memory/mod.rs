//! In-process store implementations.
//!
//! Used by the service test suites and by tooling that runs without a
//! database. Each store can be told to fail its writes so callers can
//! exercise their partial-failure paths.

pub mod activity;
pub mod metadata;
pub mod nas_share;
pub mod share;
pub mod user;

pub use activity::MemoryActivityStore;
pub use metadata::MemoryMetadataStore;
pub use nas_share::MemoryNasShareStore;
pub use share::MemoryShareStore;
pub use user::MemoryUserStore;

use std::sync::atomic::{AtomicBool, Ordering};

use nasbox_core::error::AppError;
use nasbox_core::result::AppResult;

/// Switch that makes a store's writes fail on demand.
#[derive(Debug, Default)]
pub(crate) struct FailSwitch(AtomicBool);

impl FailSwitch {
    pub(crate) fn set(&self, failing: bool) {
        self.0.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn check(&self, what: &str) -> AppResult<()> {
        if self.0.load(Ordering::SeqCst) {
            Err(AppError::database(format!("Simulated failure: {what}")))
        } else {
            Ok(())
        }
    }
}
