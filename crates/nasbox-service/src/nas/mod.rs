//! Administrator-managed NFS/SMB exports.

pub mod service;

pub use service::{CreateNasShareRequest, NasShareService};
