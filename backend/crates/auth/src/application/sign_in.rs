//! Sign In Use Case
//!
//! Validates credentials and replaces the caller's session with a fresh
//! member session.

use std::sync::Arc;

use crate::application::credential::CredentialValidator;
use crate::application::session_authority::{IssuedSession, SessionAuthority};
use crate::domain::entity::identity::Identity;
use crate::domain::repository::AuthRepository;
use crate::error::{AuthError, AuthResult};
use kernel::error::app_error::FieldError;

/// Sign in input
pub struct SignInInput {
    /// User name as typed
    pub identifier: String,
    pub password: String,
    /// Token the caller arrived with, if any
    pub previous_token: Option<String>,
}

/// Sign in output
pub struct SignInOutput {
    pub identity: Identity,
    pub issued: IssuedSession,
}

pub struct SignInUseCase<R>
where
    R: AuthRepository,
{
    validator: Arc<CredentialValidator<R>>,
    authority: Arc<SessionAuthority<R>>,
}

impl<R> SignInUseCase<R>
where
    R: AuthRepository,
{
    pub fn new(validator: Arc<CredentialValidator<R>>, authority: Arc<SessionAuthority<R>>) -> Self {
        Self {
            validator,
            authority,
        }
    }

    pub async fn execute(&self, input: SignInInput) -> AuthResult<SignInOutput> {
        let mut missing = Vec::new();
        if input.identifier.trim().is_empty() {
            missing.push(FieldError::new("username", "is required"));
        }
        if input.password.is_empty() {
            missing.push(FieldError::new("password", "is required"));
        }
        if !missing.is_empty() {
            return Err(AuthError::ValidationFailed(missing));
        }

        let identity = self
            .validator
            .verify(&input.identifier, input.password)
            .await?;

        // A session that existed before sign-in is never promoted
        if let Some(previous) = input.previous_token.as_deref() {
            self.authority.revoke(previous).await?;
        }
        let issued = self.authority.issue(&identity).await?;

        tracing::info!(
            identity_id = %identity.identity_id,
            session_id = %issued.session.session_id,
            "Member signed in"
        );

        Ok(SignInOutput { identity, issued })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::AuthConfig;
    use crate::domain::value_object::user_name::UserName;
    use crate::infra::memory::MemoryAuthRepository;
    use platform::password::{ClearTextPassword, HashParams};

    fn setup() -> (SignInUseCase<MemoryAuthRepository>, Arc<SessionAuthority<MemoryAuthRepository>>) {
        let config = Arc::new(AuthConfig {
            password_hash: HashParams::light(),
            ..AuthConfig::development()
        });
        let repo = Arc::new(MemoryAuthRepository::new());
        let credential = ClearTextPassword::new("Tracks&Turrets42".to_string())
            .unwrap()
            .hash_with(&HashParams::light(), None)
            .unwrap();
        repo.insert_identity(Identity::new(
            UserName::new("gunner").unwrap(),
            credential,
            "member",
        ))
        .unwrap();

        let validator = Arc::new(CredentialValidator::new(Arc::clone(&repo), Arc::clone(&config)).unwrap());
        let authority = Arc::new(SessionAuthority::new(repo, config));
        (SignInUseCase::new(validator, Arc::clone(&authority)), authority)
    }

    fn input(identifier: &str, password: &str, previous: Option<String>) -> SignInInput {
        SignInInput {
            identifier: identifier.to_string(),
            password: password.to_string(),
            previous_token: previous,
        }
    }

    #[tokio::test]
    async fn sign_in_issues_member_session() {
        let (use_case, authority) = setup();
        let out = use_case
            .execute(input("Gunner", "Tracks&Turrets42", None))
            .await
            .unwrap();

        assert_eq!(out.identity.user_name.as_str(), "gunner");
        assert!(authority.validate(&out.issued.token).await.is_ok());
    }

    #[tokio::test]
    async fn previous_session_is_replaced() {
        let (use_case, authority) = setup();
        let guest = authority.issue_guest().await.unwrap();

        let out = use_case
            .execute(input("gunner", "Tracks&Turrets42", Some(guest.token.clone())))
            .await
            .unwrap();

        assert_ne!(out.issued.token, guest.token);
        assert!(authority.validate(&guest.token).await.is_err());
    }

    #[tokio::test]
    async fn blank_fields_are_validation_errors() {
        let (use_case, _) = setup();
        match use_case.execute(input("  ", "", None)).await {
            Err(AuthError::ValidationFailed(fields)) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.to_string()).collect();
                assert_eq!(names, ["username", "password"]);
            }
            other => panic!("unexpected {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn wrong_password_keeps_previous_session() {
        let (use_case, authority) = setup();
        let guest = authority.issue_guest().await.unwrap();

        let err = use_case
            .execute(input("gunner", "wrong", Some(guest.token.clone())))
            .await
            .err();
        assert!(matches!(err, Some(AuthError::InvalidCredentials)));
        assert!(authority.validate(&guest.token).await.is_ok());
    }
}
