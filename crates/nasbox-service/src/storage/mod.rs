//! Disk usage reporting and metadata reconciliation.

pub mod reconcile;
pub mod service;

pub use reconcile::ReconcileReport;
pub use service::{StorageService, UsageScope};
