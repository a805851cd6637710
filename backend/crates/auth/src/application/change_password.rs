//! Change Password Use Case
//!
//! Re-verifies the current secret, stores the new hash, ends every session of
//! the identity and starts a fresh one for the caller.

use std::sync::Arc;

use platform::password::ClearTextPassword;

use crate::application::credential::CredentialValidator;
use crate::application::session_authority::{IssuedSession, SessionAuthority};
use crate::domain::entity::identity::Identity;
use crate::domain::repository::AuthRepository;
use crate::error::{AuthError, AuthResult};

pub struct ChangePasswordInput {
    pub current_password: String,
    pub new_password: String,
}

pub struct ChangePasswordUseCase<R>
where
    R: AuthRepository,
{
    repo: Arc<R>,
    validator: Arc<CredentialValidator<R>>,
    authority: Arc<SessionAuthority<R>>,
}

impl<R> ChangePasswordUseCase<R>
where
    R: AuthRepository,
{
    pub fn new(
        repo: Arc<R>,
        validator: Arc<CredentialValidator<R>>,
        authority: Arc<SessionAuthority<R>>,
    ) -> Self {
        Self {
            repo,
            validator,
            authority,
        }
    }

    pub async fn execute(
        &self,
        identity: &Identity,
        input: ChangePasswordInput,
    ) -> AuthResult<IssuedSession> {
        if input.current_password == input.new_password {
            return Err(AuthError::field(
                "newPassword",
                "must differ from the current password",
            ));
        }

        let new_password = ClearTextPassword::new(input.new_password)
            .map_err(|e| AuthError::field("newPassword", e.to_string()))?;

        if !self
            .validator
            .verify_secret(identity, input.current_password)
            .await?
        {
            return Err(AuthError::field("currentPassword", "is incorrect"));
        }

        let credential = self.validator.hash_secret(new_password).await?;
        let updated = self
            .repo
            .update_credential(&identity.identity_id, credential)
            .await?;

        let revoked = self.authority.revoke_all(&updated.identity_id).await?;
        let issued = self.authority.issue(&updated).await?;

        tracing::info!(
            identity_id = %updated.identity_id,
            sessions_revoked = revoked,
            "Password changed"
        );
        Ok(issued)
    }
}
