//! Domain Layer
//!
//! Contains entities, value objects, and repository traits.

pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{identity::Identity, role::Role, session::Session};
pub use repository::{AuthRepository, IdentityRepository, RoleRepository, SessionRepository};
