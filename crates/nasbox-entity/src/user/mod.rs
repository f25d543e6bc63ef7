//! User entity and role.

pub mod model;
pub mod role;

pub use model::{NewUser, User};
pub use role::UserRole;
