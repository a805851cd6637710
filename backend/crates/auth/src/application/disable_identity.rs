//! Disable Identity Use Case
//!
//! Deleting a member soft-disables it; the record stays and its sessions end.

use std::sync::Arc;

use crate::application::session_authority::SessionAuthority;
use crate::domain::entity::identity::Identity;
use crate::domain::repository::AuthRepository;
use crate::domain::value_object::identity_status::IdentityStatus;
use crate::domain::value_object::user_name::UserName;
use crate::error::{AuthError, AuthResult};

pub struct DisableIdentityUseCase<R>
where
    R: AuthRepository,
{
    repo: Arc<R>,
    authority: Arc<SessionAuthority<R>>,
}

impl<R> DisableIdentityUseCase<R>
where
    R: AuthRepository,
{
    pub fn new(repo: Arc<R>, authority: Arc<SessionAuthority<R>>) -> Self {
        Self { repo, authority }
    }

    /// Disable the member named `target` on behalf of `actor`
    pub async fn execute(&self, actor: &Identity, target: &str) -> AuthResult<Identity> {
        let user_name =
            UserName::lookup_key(target).ok_or_else(|| AuthError::field("username", "is required"))?;

        if user_name == actor.user_name {
            return Err(AuthError::field("username", "cannot disable your own account"));
        }

        let target = self
            .repo
            .find_identity_by_name(&user_name)
            .await?
            .ok_or(AuthError::NotFound("Member"))?;

        let identity = self
            .repo
            .update_status(&target.identity_id, IdentityStatus::Disabled)
            .await?;
        let revoked = self.authority.revoke_all(&identity.identity_id).await?;

        tracing::info!(
            actor_id = %actor.identity_id,
            identity_id = %identity.identity_id,
            sessions_revoked = revoked,
            "Member disabled"
        );
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::AuthConfig;
    use crate::domain::repository::IdentityRepository;
    use crate::infra::memory::MemoryAuthRepository;
    use platform::password::{ClearTextPassword, HashParams};

    fn identity(repo: &MemoryAuthRepository, name: &str) -> Identity {
        let credential = ClearTextPassword::for_verification("unused".to_string())
            .hash_with(&HashParams::light(), None)
            .unwrap();
        let identity = Identity::new(UserName::new(name).unwrap(), credential, "member");
        repo.insert_identity(identity.clone()).unwrap();
        identity
    }

    fn setup() -> (
        DisableIdentityUseCase<MemoryAuthRepository>,
        Arc<SessionAuthority<MemoryAuthRepository>>,
        Arc<MemoryAuthRepository>,
    ) {
        let repo = Arc::new(MemoryAuthRepository::new());
        let authority = Arc::new(SessionAuthority::new(
            Arc::clone(&repo),
            Arc::new(AuthConfig::development()),
        ));
        (
            DisableIdentityUseCase::new(Arc::clone(&repo), Arc::clone(&authority)),
            authority,
            repo,
        )
    }

    #[tokio::test]
    async fn disabling_ends_sessions_and_keeps_record() {
        let (use_case, authority, repo) = setup();
        let admin = identity(&repo, "warden");
        let target = identity(&repo, "deserter");
        let issued = authority.issue(&target).await.unwrap();

        let disabled = use_case.execute(&admin, "Deserter").await.unwrap();
        assert_eq!(disabled.status, IdentityStatus::Disabled);
        assert!(authority.validate(&issued.token).await.is_err());

        let stored = repo.find_identity(&target.identity_id).await.unwrap().unwrap();
        assert_eq!(stored.status, IdentityStatus::Disabled);
        assert_eq!(repo.identity_count(), 2);
    }

    #[tokio::test]
    async fn cannot_disable_self() {
        let (use_case, _, repo) = setup();
        let admin = identity(&repo, "warden");

        assert!(matches!(
            use_case.execute(&admin, "WARDEN").await,
            Err(AuthError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn unknown_target() {
        let (use_case, _, repo) = setup();
        let admin = identity(&repo, "warden");

        assert!(matches!(
            use_case.execute(&admin, "ghost").await,
            Err(AuthError::NotFound(_))
        ));
        assert!(matches!(
            use_case.execute(&admin, "   ").await,
            Err(AuthError::ValidationFailed(_))
        ));
    }
}
