//! # nasbox-entity
//!
//! Domain entity models for NasBox. Every struct in this crate represents
//! a database table row or a domain value object. Row types additionally
//! derive `sqlx::FromRow`; enums map onto PostgreSQL enum types.

pub mod activity;
pub mod file;
pub mod folder;
pub mod metadata;
pub mod nas;
pub mod share;
pub mod storage;
pub mod user;
