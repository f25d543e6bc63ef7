//! # nasbox-database
//!
//! Persistence for NasBox metadata. The store traits in [`store`] are what
//! services depend on; [`repositories`] implements them over PostgreSQL
//! and [`memory`] implements them in process for tests and tooling.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{ActivityStore, MetadataStore, NasShareStore, ShareStore, UserStore};
