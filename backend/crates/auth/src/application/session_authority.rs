//! Session Authority
//!
//! Issues, signs, validates and revokes sessions. The cookie value is
//! `<session-id>.<signature>`: the simple-format UUID followed by its
//! HMAC-SHA256 in unpadded URL-safe Base64.

use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use kernel::id::SessionId;
use platform::cookie::extract_cookie;
use platform::crypto::{TokenError, sign_token, verify_token};
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::domain::entity::identity::Identity;
use crate::domain::entity::session::{Session, SessionSubject};
use crate::domain::repository::AuthRepository;
use crate::domain::value_object::identity_id::IdentityId;
use crate::error::{AuthError, AuthResult, SessionRejection};

/// Who a valid session belongs to
///
/// `renewed` is set when validation pushed the expiry forward; the cookie
/// must then be sent again with the new `Max-Age`.
#[derive(Debug, Clone)]
pub enum Principal {
    Guest {
        session: Session,
        renewed: bool,
    },
    Member {
        identity: Identity,
        session: Session,
        renewed: bool,
    },
}

impl Principal {
    pub fn session(&self) -> &Session {
        match self {
            Principal::Guest { session, .. } | Principal::Member { session, .. } => session,
        }
    }

    pub fn renewed(&self) -> bool {
        match self {
            Principal::Guest { renewed, .. } | Principal::Member { renewed, .. } => *renewed,
        }
    }
}

/// A freshly stored session and its signed token
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

pub struct SessionAuthority<R>
where
    R: AuthRepository,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
}

impl<R> SessionAuthority<R>
where
    R: AuthRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }

    // ========================================================================
    // Issue
    // ========================================================================

    /// Start a member session for `identity`
    pub async fn issue(&self, identity: &Identity) -> AuthResult<IssuedSession> {
        let issued = self
            .issue_for(
                SessionSubject::Member(identity.identity_id),
                self.config.session_ttl_chrono(),
            )
            .await?;

        tracing::info!(
            identity_id = %identity.identity_id,
            session_id = %issued.session.session_id,
            "Session issued"
        );
        Ok(issued)
    }

    /// Start a guest session; lives for the guest lifetime
    pub async fn issue_guest(&self) -> AuthResult<IssuedSession> {
        let issued = self
            .issue_for(SessionSubject::Guest, self.config.guest_session_ttl_chrono())
            .await?;
        tracing::debug!(session_id = %issued.session.session_id, "Guest session issued");
        Ok(issued)
    }

    async fn issue_for(
        &self,
        subject: SessionSubject,
        ttl: chrono::Duration,
    ) -> AuthResult<IssuedSession> {
        let session = Session::new(subject, ttl);
        self.repo.create_session(&session).await?;

        Ok(IssuedSession {
            token: self.sign(&session.session_id),
            session,
        })
    }

    fn sign(&self, session_id: &SessionId) -> String {
        let payload = session_id.as_uuid().simple().to_string();
        sign_token(&self.config.session_secret, &payload)
    }

    // ========================================================================
    // Validate
    // ========================================================================

    /// Resolve a token to its principal
    ///
    /// Every failure is `AuthError::Unauthorized` with the reason attached;
    /// only storage faults surface as other errors.
    pub async fn validate(&self, token: &str) -> AuthResult<Principal> {
        self.validate_at(token, Utc::now()).await
    }

    pub async fn validate_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Principal> {
        let session_id = self.parse_token(token).map_err(AuthError::Unauthorized)?;

        let mut session = self
            .repo
            .find_session(&session_id)
            .await?
            .ok_or(AuthError::Unauthorized(SessionRejection::Unknown))?;

        if session.is_expired_at(now) {
            return Err(AuthError::Unauthorized(SessionRejection::Expired));
        }

        let principal = match session.subject {
            SessionSubject::Guest => None,
            SessionSubject::Member(identity_id) => {
                let identity = self
                    .repo
                    .find_identity(&identity_id)
                    .await?
                    .filter(Identity::can_authenticate)
                    .ok_or(AuthError::Unauthorized(SessionRejection::IdentityInactive))?;
                Some(identity)
            }
        };

        let ttl = match principal {
            None => self.config.guest_session_ttl_chrono(),
            Some(_) => self.config.session_ttl_chrono(),
        };
        let renewed = self.config.session_sliding_renewal && session.extend_if_needed(now, ttl);
        if renewed {
            self.repo.update_session(&session).await?;
        }

        Ok(match principal {
            None => Principal::Guest { session, renewed },
            Some(identity) => Principal::Member {
                identity,
                session,
                renewed,
            },
        })
    }

    /// Verify the signature, then read the id
    fn parse_token(&self, token: &str) -> Result<SessionId, SessionRejection> {
        let payload = verify_token(&self.config.session_secret, token).map_err(|e| match e {
            TokenError::Malformed => SessionRejection::Malformed,
            TokenError::BadSignature => SessionRejection::Tampered,
        })?;

        Uuid::try_parse(payload)
            .map(SessionId::from_uuid)
            .map_err(|_| SessionRejection::Malformed)
    }

    // ========================================================================
    // Revoke
    // ========================================================================

    /// Delete the session behind `token`; a bad signature revokes nothing
    pub async fn revoke(&self, token: &str) -> AuthResult<bool> {
        let Ok(session_id) = self.parse_token(token) else {
            return Ok(false);
        };
        let deleted = self.repo.delete_session(&session_id).await?;

        if deleted {
            tracing::info!(session_id = %session_id, "Session revoked");
        }
        Ok(deleted)
    }

    /// Delete every session of `identity_id`
    pub async fn revoke_all(&self, identity_id: &IdentityId) -> AuthResult<u64> {
        let deleted = self.repo.delete_sessions_for_identity(identity_id).await?;

        tracing::info!(
            identity_id = %identity_id,
            sessions_deleted = deleted,
            "All sessions revoked"
        );
        Ok(deleted)
    }

    /// Purge expired sessions
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        self.repo.cleanup_expired_sessions(Utc::now()).await
    }

    // ========================================================================
    // Cookie
    // ========================================================================

    /// Session token from the request cookie, if any
    pub fn read_token(&self, headers: &HeaderMap) -> Option<String> {
        extract_cookie(headers, &self.config.session_cookie_name).filter(|t| !t.is_empty())
    }

    /// `Set-Cookie` value carrying `issued`
    pub fn session_cookie(&self, issued: &IssuedSession) -> String {
        self.cookie_for(&issued.token, &issued.session)
    }

    /// `Set-Cookie` value for `token`, expiring with `session`
    pub fn cookie_for(&self, token: &str, session: &Session) -> String {
        let mut cookie = self.config.session_cookie();
        cookie.max_age_secs = Some(session.remaining_at(Utc::now()).num_seconds());
        cookie.build_set_cookie(token)
    }

    /// `Set-Cookie` value that deletes the session cookie
    pub fn clear_cookie(&self) -> String {
        self.config.session_cookie().build_delete_cookie()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::{IdentityRepository, SessionRepository};
    use crate::domain::value_object::identity_status::IdentityStatus;
    use crate::domain::value_object::user_name::UserName;
    use crate::infra::memory::MemoryAuthRepository;
    use platform::password::{ClearTextPassword, HashParams};
    use std::time::Duration;

    fn setup(sliding: bool) -> (SessionAuthority<MemoryAuthRepository>, Arc<MemoryAuthRepository>, Identity) {
        let config = Arc::new(AuthConfig {
            session_ttl: Duration::from_secs(3600),
            session_sliding_renewal: sliding,
            ..AuthConfig::development()
        });
        let repo = Arc::new(MemoryAuthRepository::new());
        let credential = ClearTextPassword::for_verification("unused".to_string())
            .hash_with(&HashParams::light(), None)
            .unwrap();
        let identity = Identity::new(UserName::new("loader").unwrap(), credential, "member");
        repo.insert_identity(identity.clone()).unwrap();

        (
            SessionAuthority::new(Arc::clone(&repo), config),
            repo,
            identity,
        )
    }

    fn rejection(err: AuthError) -> SessionRejection {
        match err {
            AuthError::Unauthorized(r) => r,
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn issue_then_validate_returns_identity() {
        let (authority, _, identity) = setup(false);
        let issued = authority.issue(&identity).await.unwrap();

        match authority.validate(&issued.token).await.unwrap() {
            Principal::Member { identity: found, .. } => {
                assert_eq!(found.identity_id, identity.identity_id)
            }
            other => panic!("expected member, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn guest_session_validates_as_guest() {
        let (authority, _, _) = setup(false);
        let issued = authority.issue_guest().await.unwrap();
        assert!(matches!(
            authority.validate(&issued.token).await.unwrap(),
            Principal::Guest { .. }
        ));
    }

    #[tokio::test]
    async fn revoked_session_is_unknown() {
        let (authority, _, identity) = setup(false);
        let issued = authority.issue(&identity).await.unwrap();

        assert!(authority.revoke(&issued.token).await.unwrap());
        let err = authority.validate(&issued.token).await.unwrap_err();
        assert_eq!(rejection(err), SessionRejection::Unknown);
    }

    #[tokio::test]
    async fn forged_token_revokes_nothing() {
        let (authority, repo, identity) = setup(false);
        let issued = authority.issue(&identity).await.unwrap();
        let (id, _) = issued.token.split_once('.').unwrap();
        let forged = format!("{id}.AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");

        assert!(!authority.revoke(&forged).await.unwrap());
        assert_eq!(repo.session_count(), 1);
    }

    #[tokio::test]
    async fn expired_session_rejected() {
        let (authority, _, identity) = setup(false);
        let issued = authority.issue(&identity).await.unwrap();

        let later = issued.session.expires_at + chrono::Duration::seconds(1);
        let err = authority.validate_at(&issued.token, later).await.unwrap_err();
        assert_eq!(rejection(err), SessionRejection::Expired);
    }

    #[tokio::test]
    async fn disabled_identity_voids_live_session() {
        let (authority, repo, identity) = setup(false);
        let issued = authority.issue(&identity).await.unwrap();

        repo.update_status(&identity.identity_id, IdentityStatus::Disabled)
            .await
            .unwrap();

        let err = authority.validate(&issued.token).await.unwrap_err();
        assert_eq!(rejection(err), SessionRejection::IdentityInactive);
    }

    #[tokio::test]
    async fn malformed_and_tampered_are_distinguished() {
        let (authority, _, identity) = setup(false);
        let issued = authority.issue(&identity).await.unwrap();

        let err = authority.validate("garbage").await.unwrap_err();
        assert_eq!(rejection(err), SessionRejection::Malformed);

        let other_key = SessionAuthority::new(
            Arc::new(MemoryAuthRepository::new()),
            Arc::new(AuthConfig::development()),
        );
        let foreign = other_key.issue_guest().await.unwrap();
        let err = authority.validate(&foreign.token).await.unwrap_err();
        assert_eq!(rejection(err), SessionRejection::Tampered);

        assert!(authority.validate(&issued.token).await.is_ok());
    }

    #[tokio::test]
    async fn sliding_renewal_only_when_enabled() {
        for sliding in [false, true] {
            let (authority, repo, identity) = setup(sliding);
            let issued = authority.issue(&identity).await.unwrap();
            let late = issued.session.issued_at + chrono::Duration::minutes(45);

            let principal = authority.validate_at(&issued.token, late).await.unwrap();
            assert_eq!(principal.renewed(), sliding);
            let stored = repo
                .find_session(&issued.session.session_id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(stored.expires_at > issued.session.expires_at, sliding);
        }
    }

    #[tokio::test]
    async fn guest_sessions_use_the_guest_lifetime() {
        let (authority, _, identity) = setup(false);
        let guest = authority.issue_guest().await.unwrap();
        let member = authority.issue(&identity).await.unwrap();

        assert_eq!(
            guest.session.expires_at - guest.session.issued_at,
            chrono::Duration::minutes(30)
        );
        assert_eq!(
            member.session.expires_at - member.session.issued_at,
            chrono::Duration::hours(1)
        );
    }

    #[tokio::test]
    async fn revoke_all_clears_every_session() {
        let (authority, repo, identity) = setup(false);
        let first = authority.issue(&identity).await.unwrap();
        let second = authority.issue(&identity).await.unwrap();
        authority.issue_guest().await.unwrap();

        assert_eq!(authority.revoke_all(&identity.identity_id).await.unwrap(), 2);
        assert!(authority.validate(&first.token).await.is_err());
        assert!(authority.validate(&second.token).await.is_err());
        assert_eq!(repo.session_count(), 1);
    }

    #[tokio::test]
    async fn cookie_attributes() {
        let (authority, _, identity) = setup(false);
        let issued = authority.issue(&identity).await.unwrap();

        let cookie = authority.session_cookie(&issued);
        assert!(cookie.starts_with(&format!("portal_session={}", issued.token)));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
        assert!(!cookie.contains("Secure"));

        assert!(authority.clear_cookie().contains("Max-Age=0"));
    }
}
