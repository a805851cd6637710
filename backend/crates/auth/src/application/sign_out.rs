//! Sign Out Use Case

use std::sync::Arc;

use crate::application::session_authority::SessionAuthority;
use crate::domain::repository::AuthRepository;
use crate::error::AuthResult;

pub struct SignOutUseCase<R>
where
    R: AuthRepository,
{
    authority: Arc<SessionAuthority<R>>,
}

impl<R> SignOutUseCase<R>
where
    R: AuthRepository,
{
    pub fn new(authority: Arc<SessionAuthority<R>>) -> Self {
        Self { authority }
    }

    /// Revoke the caller's session; signing out without one is not an error
    pub async fn execute(&self, token: Option<&str>) -> AuthResult<bool> {
        match token {
            Some(token) => self.authority.revoke(token).await,
            None => Ok(false),
        }
    }
}
