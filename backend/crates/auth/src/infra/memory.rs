//! In-Memory Repository Implementation
//!
//! Single-process store for identities, roles and sessions. Every map is a
//! sharded `DashMap`, so a revoke is visible to the next lookup on any task.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use kernel::id::SessionId;
use platform::password::HashedPassword;

use crate::domain::entity::{identity::Identity, role::Role, session::Session};
use crate::domain::repository::{IdentityRepository, RoleRepository, SessionRepository};
use crate::domain::value_object::{
    identity_id::IdentityId, identity_status::IdentityStatus, user_name::UserName,
};
use crate::error::{AuthError, AuthResult, SessionRejection};

#[derive(Default)]
struct Inner {
    identities: DashMap<IdentityId, Identity>,
    names: DashMap<UserName, IdentityId>,
    roles: DashMap<String, Role>,
    sessions: DashMap<SessionId, Session>,
}

/// In-memory auth repository
#[derive(Clone, Default)]
pub struct MemoryAuthRepository {
    inner: Arc<Inner>,
}

impl MemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identity; user names are unique
    pub fn insert_identity(&self, identity: Identity) -> AuthResult<()> {
        match self.inner.names.entry(identity.user_name.clone()) {
            Entry::Occupied(_) => Err(AuthError::field("username", "is already taken")),
            Entry::Vacant(slot) => {
                slot.insert(identity.identity_id);
                self.inner.identities.insert(identity.identity_id, identity);
                Ok(())
            }
        }
    }

    /// Add or replace a role
    pub fn insert_role(&self, role: Role) {
        self.inner.roles.insert(role.name.clone(), role);
    }

    pub fn identity_count(&self) -> usize {
        self.inner.identities.len()
    }

    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }
}

// ============================================================================
// Identity Repository Implementation
// ============================================================================

impl IdentityRepository for MemoryAuthRepository {
    async fn find_identity_by_name(&self, user_name: &UserName) -> AuthResult<Option<Identity>> {
        let Some(id) = self.inner.names.get(user_name).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.inner.identities.get(&id).map(|i| i.clone()))
    }

    async fn find_identity(&self, identity_id: &IdentityId) -> AuthResult<Option<Identity>> {
        Ok(self.inner.identities.get(identity_id).map(|i| i.clone()))
    }

    async fn update_credential(
        &self,
        identity_id: &IdentityId,
        credential: HashedPassword,
    ) -> AuthResult<Identity> {
        let mut stored = self
            .inner
            .identities
            .get_mut(identity_id)
            .ok_or(AuthError::NotFound("Identity"))?;

        if !stored.can_authenticate() {
            return Err(AuthError::Unauthorized(SessionRejection::IdentityInactive));
        }
        stored.set_credential(credential);
        Ok(stored.clone())
    }

    async fn update_status(
        &self,
        identity_id: &IdentityId,
        status: IdentityStatus,
    ) -> AuthResult<Identity> {
        let mut stored = self
            .inner
            .identities
            .get_mut(identity_id)
            .ok_or(AuthError::NotFound("Identity"))?;

        if stored.status != status {
            stored.set_status(status);
        }
        Ok(stored.clone())
    }
}

// ============================================================================
// Role Repository Implementation
// ============================================================================

impl RoleRepository for MemoryAuthRepository {
    async fn find_role(&self, name: &str) -> AuthResult<Option<Role>> {
        Ok(self.inner.roles.get(name).map(|r| r.clone()))
    }
}

// ============================================================================
// Session Repository Implementation
// ============================================================================

impl SessionRepository for MemoryAuthRepository {
    async fn create_session(&self, session: &Session) -> AuthResult<()> {
        self.inner
            .sessions
            .insert(session.session_id, session.clone());
        Ok(())
    }

    async fn find_session(&self, session_id: &SessionId) -> AuthResult<Option<Session>> {
        Ok(self.inner.sessions.get(session_id).map(|s| s.clone()))
    }

    async fn update_session(&self, session: &Session) -> AuthResult<()> {
        // A session revoked mid-request stays revoked.
        if let Some(mut stored) = self.inner.sessions.get_mut(&session.session_id) {
            *stored = session.clone();
        }
        Ok(())
    }

    async fn delete_session(&self, session_id: &SessionId) -> AuthResult<bool> {
        Ok(self.inner.sessions.remove(session_id).is_some())
    }

    async fn delete_sessions_for_identity(&self, identity_id: &IdentityId) -> AuthResult<u64> {
        let mut deleted = 0u64;
        self.inner.sessions.retain(|_, s| {
            let keep = s.identity_id() != Some(*identity_id);
            deleted += u64::from(!keep);
            keep
        });
        Ok(deleted)
    }

    async fn cleanup_expired_sessions(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let mut deleted = 0u64;
        self.inner.sessions.retain(|_, s| {
            let keep = !s.is_expired_at(now);
            deleted += u64::from(!keep);
            keep
        });

        tracing::debug!(sessions_deleted = deleted, "Cleaned up expired sessions");

        Ok(deleted)
    }
}
