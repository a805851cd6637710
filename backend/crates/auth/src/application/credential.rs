//! Credential Validator
//!
//! Checks a submitted identifier and secret against stored identities.
//! Never exposed to routes directly; the sign-in use case calls it.

use std::sync::Arc;

use platform::crypto::{random_bytes, to_base64};
use platform::password::{ClearTextPassword, HashedPassword};

use crate::application::config::AuthConfig;
use crate::domain::entity::identity::Identity;
use crate::domain::repository::AuthRepository;
use crate::domain::value_object::user_name::UserName;
use crate::error::{AuthError, AuthResult};

pub struct CredentialValidator<R>
where
    R: AuthRepository,
{
    repo: Arc<R>,
    config: Arc<AuthConfig>,
    /// Verified against when the identifier is unknown, so both paths cost
    /// one full hash
    decoy: HashedPassword,
}

impl<R> CredentialValidator<R>
where
    R: AuthRepository,
{
    /// Build the validator; hashes the decoy with the configured cost
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> AuthResult<Self> {
        let decoy = ClearTextPassword::for_verification(to_base64(&random_bytes(24)))
            .hash_with(&config.password_hash, config.pepper())?;

        Ok(Self {
            repo,
            config,
            decoy,
        })
    }

    /// Verify `identifier` / `secret`
    ///
    /// Unknown identifier, wrong secret and disabled account all return
    /// [`AuthError::InvalidCredentials`]; which one it was is only logged at
    /// debug level.
    pub async fn verify(&self, identifier: &str, secret: String) -> AuthResult<Identity> {
        let identity = match UserName::lookup_key(identifier) {
            Some(user_name) => self.repo.find_identity_by_name(&user_name).await?,
            None => None,
        };

        let hash = identity
            .as_ref()
            .map(|i| i.credential.clone())
            .unwrap_or_else(|| self.decoy.clone());
        let (matched, password) = self.check(hash, secret).await?;

        match identity {
            None => {
                tracing::debug!(reason = "unknown_identifier", "Credential check failed");
                Err(AuthError::InvalidCredentials)
            }
            Some(identity) if !matched => {
                tracing::debug!(
                    reason = "wrong_secret",
                    identity_id = %identity.identity_id,
                    "Credential check failed"
                );
                Err(AuthError::InvalidCredentials)
            }
            Some(identity) if !identity.can_authenticate() => {
                tracing::debug!(
                    reason = "identity_inactive",
                    identity_id = %identity.identity_id,
                    "Credential check failed"
                );
                Err(AuthError::InvalidCredentials)
            }
            Some(identity) => self.upgrade_hash(identity, password).await,
        }
    }

    /// Rehash a credential made under older cost parameters
    ///
    /// A failed rehash never fails the sign-in, but an identity disabled
    /// while the hash ran does.
    async fn upgrade_hash(
        &self,
        identity: Identity,
        password: ClearTextPassword,
    ) -> AuthResult<Identity> {
        if !identity.credential.needs_rehash(&self.config.password_hash) {
            return Ok(identity);
        }

        let credential = match self.hash_secret(password).await {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(error = %e, identity_id = %identity.identity_id, "Credential rehash failed");
                return Ok(identity);
            }
        };

        match self
            .repo
            .update_credential(&identity.identity_id, credential)
            .await
        {
            Ok(updated) => {
                tracing::info!(identity_id = %updated.identity_id, "Credential rehashed with current parameters");
                Ok(updated)
            }
            Err(AuthError::Unauthorized(_)) => {
                tracing::debug!(
                    reason = "identity_inactive",
                    identity_id = %identity.identity_id,
                    "Credential check failed"
                );
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => {
                tracing::warn!(error = %e, identity_id = %identity.identity_id, "Credential rehash not stored");
                Ok(identity)
            }
        }
    }

    /// Check `secret` against an identity already in hand
    pub async fn verify_secret(&self, identity: &Identity, secret: String) -> AuthResult<bool> {
        let (matched, _) = self.check(identity.credential.clone(), secret).await?;
        Ok(matched)
    }

    /// Hash a new secret with the configured cost
    pub async fn hash_secret(&self, secret: ClearTextPassword) -> AuthResult<HashedPassword> {
        let params = self.config.password_hash;
        let pepper = self.config.password_pepper.clone();

        let hashed =
            tokio::task::spawn_blocking(move || secret.hash_with(&params, pepper.as_deref()))
                .await??;
        Ok(hashed)
    }

    /// Argon2 runs on the blocking pool
    async fn check(
        &self,
        hash: HashedPassword,
        secret: String,
    ) -> AuthResult<(bool, ClearTextPassword)> {
        let pepper = self.config.password_pepper.clone();

        let checked = tokio::task::spawn_blocking(move || {
            let password = ClearTextPassword::for_verification(secret);
            let matched = hash.verify(&password, pepper.as_deref());
            (matched, password)
        })
        .await?;
        Ok(checked)
    }
}
