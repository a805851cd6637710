//! Session Entity
//!
//! Server-side session record. The cookie only carries the signed id, so
//! deleting the record revokes the cookie.

use chrono::{DateTime, Duration, Utc};
use kernel::id::SessionId;

use crate::domain::value_object::identity_id::IdentityId;

/// Who a session belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSubject {
    Member(IdentityId),
    Guest,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: SessionId,
    pub subject: SessionSubject,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session
    ///
    /// TTL is provided by the application layer (config), not hard-coded here.
    pub fn new(subject: SessionSubject, ttl: Duration) -> Self {
        Self::new_at(subject, Utc::now(), ttl)
    }

    pub fn new_at(subject: SessionSubject, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            session_id: SessionId::new(),
            subject,
            issued_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn identity_id(&self) -> Option<IdentityId> {
        match self.subject {
            SessionSubject::Member(id) => Some(id),
            SessionSubject::Guest => None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Remaining lifetime, zero once expired
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }

    /// Slide the expiry to `now + ttl` once less than half of `ttl` remains
    ///
    /// Returns whether the expiry moved.
    pub fn extend_if_needed(&mut self, now: DateTime<Utc>, ttl: Duration) -> bool {
        if self.remaining_at(now) < ttl / 2 {
            self.expires_at = now + ttl;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let session = Session::new_at(SessionSubject::Guest, now, Duration::hours(1));

        assert!(!session.is_expired_at(now + Duration::minutes(59)));
        assert!(session.is_expired_at(now + Duration::hours(1)));
    }

    #[test]
    fn test_extend_only_past_half_life() {
        let now = Utc::now();
        let ttl = Duration::hours(12);
        let mut session = Session::new_at(SessionSubject::Guest, now, ttl);

        assert!(!session.extend_if_needed(now + Duration::hours(5), ttl));
        assert_eq!(session.expires_at, now + ttl);

        let later = now + Duration::hours(7);
        assert!(session.extend_if_needed(later, ttl));
        assert_eq!(session.expires_at, later + ttl);
    }

    #[test]
    fn test_identity_id() {
        let id = IdentityId::new();
        let session = Session::new(SessionSubject::Member(id), Duration::hours(1));
        assert_eq!(session.identity_id(), Some(id));
        assert_eq!(
            Session::new(SessionSubject::Guest, Duration::hours(1)).identity_id(),
            None
        );
    }
}
