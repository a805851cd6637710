//! Application Layer
//!
//! Rate limiting, credential checks, sessions, the access gate and the use
//! cases built on them.

pub mod access_gate;
pub mod change_password;
pub mod config;
pub mod credential;
pub mod disable_identity;
pub mod rate_limiter;
pub mod session_authority;
pub mod sign_in;
pub mod sign_out;

// Re-exports
pub use access_gate::{AccessGate, Gate, GateOutcome, RequestShape, SessionState};
pub use change_password::{ChangePasswordInput, ChangePasswordUseCase};
pub use config::AuthConfig;
pub use credential::CredentialValidator;
pub use disable_identity::DisableIdentityUseCase;
pub use rate_limiter::{RateLimiter, RateLimiterFactory};
pub use session_authority::{IssuedSession, Principal, SessionAuthority};
pub use sign_in::{SignInInput, SignInOutput, SignInUseCase};
pub use sign_out::SignOutUseCase;
