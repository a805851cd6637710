//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.
//! Method names are distinct across traits so one store can implement all of
//! them without ambiguous calls.

use chrono::{DateTime, Utc};
use kernel::id::SessionId;
use platform::password::HashedPassword;

use crate::domain::entity::{identity::Identity, role::Role, session::Session};
use crate::domain::value_object::{
    identity_id::IdentityId, identity_status::IdentityStatus, user_name::UserName,
};
use crate::error::AuthResult;

/// Identity repository trait
#[trait_variant::make(IdentityRepository: Send)]
pub trait LocalIdentityRepository {
    /// Find identity by canonical user name
    async fn find_identity_by_name(&self, user_name: &UserName) -> AuthResult<Option<Identity>>;

    /// Find identity by ID
    async fn find_identity(&self, identity_id: &IdentityId) -> AuthResult<Option<Identity>>;

    /// Replace the credential of an identity that can still authenticate
    ///
    /// Reads the stored record under its lock, so a concurrent disable is
    /// never undone. A disabled identity fails with
    /// `Unauthorized(IdentityInactive)`.
    async fn update_credential(
        &self,
        identity_id: &IdentityId,
        credential: HashedPassword,
    ) -> AuthResult<Identity>;

    /// Set the status of an identity, leaving every other field as stored
    async fn update_status(
        &self,
        identity_id: &IdentityId,
        status: IdentityStatus,
    ) -> AuthResult<Identity>;
}

/// Role repository trait
#[trait_variant::make(RoleRepository: Send)]
pub trait LocalRoleRepository {
    /// Find role by name
    async fn find_role(&self, name: &str) -> AuthResult<Option<Role>>;
}

/// Session repository trait
#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    /// Create a new session
    async fn create_session(&self, session: &Session) -> AuthResult<()>;

    /// Find session by ID
    async fn find_session(&self, session_id: &SessionId) -> AuthResult<Option<Session>>;

    /// Update session (sliding expiry)
    async fn update_session(&self, session: &Session) -> AuthResult<()>;

    /// Delete a session; returns whether it existed
    async fn delete_session(&self, session_id: &SessionId) -> AuthResult<bool>;

    /// Delete all sessions of an identity
    async fn delete_sessions_for_identity(&self, identity_id: &IdentityId) -> AuthResult<u64>;

    /// Clean up sessions expired at `now`
    async fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}

/// Everything the auth use cases need from storage
pub trait AuthRepository:
    IdentityRepository + RoleRepository + SessionRepository + Send + Sync + 'static
{
}

impl<T> AuthRepository for T where
    T: IdentityRepository + RoleRepository + SessionRepository + Send + Sync + 'static
{
}
