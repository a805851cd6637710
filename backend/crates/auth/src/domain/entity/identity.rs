//! Identity Entity
//!
//! A registered member: login name, credential hash, role reference and
//! status. Created at registration, never hard-deleted.

use chrono::{DateTime, Utc};
use platform::password::HashedPassword;

use crate::domain::value_object::{
    identity_id::IdentityId, identity_status::IdentityStatus, user_name::UserName,
};

#[derive(Debug, Clone)]
pub struct Identity {
    pub identity_id: IdentityId,
    /// Canonical login identifier
    pub user_name: UserName,
    /// Argon2id PHC hash
    pub credential: HashedPassword,
    /// Name of the assigned [`Role`](super::role::Role)
    pub role: String,
    pub status: IdentityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(user_name: UserName, credential: HashedPassword, role: impl Into<String>) -> Self {
        let now = Utc::now();

        Self {
            identity_id: IdentityId::new(),
            user_name,
            credential,
            role: role.into(),
            status: IdentityStatus::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_authenticate(&self) -> bool {
        self.status.can_authenticate()
    }

    pub fn set_credential(&mut self, credential: HashedPassword) {
        self.credential = credential;
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: IdentityStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
