//! Administrator-managed network shares.

pub mod model;

pub use model::{NasPermission, NasProtocol, NasShare, NewNasShare, UpdateNasShare};
