//! Auth (Authentication & Authorization) Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Rate limiter factory, credential validator, session
//!   authority, access gate and the login/logout/password use cases
//! - `infra/` - In-memory repository implementation
//! - `presentation/` - Route table, route chain, handlers, failure stages
//!
//! ## Request pipeline
//! `rate limiter -> access gate -> handler -> failure stages`, assembled per
//! route from a [`RouteTable`] at startup.
//!
//! ## Security Model
//! - Passwords hashed with Argon2id (NIST SP 800-63B compliant)
//! - Sessions are server-side; the cookie only carries an HMAC-signed id
//! - Unknown user, wrong password and disabled account are indistinguishable
//! - Role scopes gate administrative routes

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::AuthConfig;
pub use error::{AuthError, AuthResult, SessionRejection};
pub use infra::memory::MemoryAuthRepository;
pub use presentation::route_table::{RouteSpec, RouteTable};
pub use presentation::router::{auth_routes, portal_router};
pub use presentation::state::AuthState;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult, FieldError},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}
