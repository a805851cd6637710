//! Shared handler state

use std::sync::Arc;

use crate::application::access_gate::AccessGate;
use crate::application::config::AuthConfig;
use crate::application::credential::CredentialValidator;
use crate::application::rate_limiter::{RateLimiter, RateLimiterFactory};
use crate::application::session_authority::SessionAuthority;
use crate::domain::repository::AuthRepository;
use crate::error::AuthResult;

/// Limiter id counting guest sessions issued per client
pub const GUEST_SESSION_LIMIT_ID: &str = "session.guest";

/// Everything a route chain or handler needs, built once at startup
pub struct AuthState<R>
where
    R: AuthRepository,
{
    pub repo: Arc<R>,
    pub config: Arc<AuthConfig>,
    pub authority: Arc<SessionAuthority<R>>,
    pub gate: Arc<AccessGate<R>>,
    pub validator: Arc<CredentialValidator<R>>,
    pub limiters: Arc<RateLimiterFactory>,
    /// Bounds guest sessions per client; excess visitors browse without one
    pub guest_limiter: RateLimiter,
}

impl<R> Clone for AuthState<R>
where
    R: AuthRepository,
{
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            config: Arc::clone(&self.config),
            authority: Arc::clone(&self.authority),
            gate: Arc::clone(&self.gate),
            validator: Arc::clone(&self.validator),
            limiters: Arc::clone(&self.limiters),
            guest_limiter: self.guest_limiter.clone(),
        }
    }
}

impl<R> AuthState<R>
where
    R: AuthRepository,
{
    pub fn new(repo: R, config: AuthConfig) -> AuthResult<Self> {
        let repo = Arc::new(repo);
        let config = Arc::new(config);

        let authority = Arc::new(SessionAuthority::new(Arc::clone(&repo), Arc::clone(&config)));
        let gate = Arc::new(AccessGate::new(
            Arc::clone(&authority),
            Arc::clone(&repo),
            Arc::clone(&config),
        ));
        let validator = Arc::new(CredentialValidator::new(Arc::clone(&repo), Arc::clone(&config))?);
        let limiters = Arc::new(RateLimiterFactory::in_memory(Arc::clone(&config)));
        let guest_limiter =
            limiters.create(GUEST_SESSION_LIMIT_ID, config.guest_sessions_per_window);

        Ok(Self {
            repo,
            config,
            authority,
            gate,
            validator,
            limiters,
            guest_limiter,
        })
    }

    /// Purge expired sessions and elapsed rate windows
    pub async fn sweep(&self) -> AuthResult<()> {
        let sessions = self.authority.cleanup_expired().await?;
        let windows = self.limiters.purge_expired();

        if sessions > 0 || windows > 0 {
            tracing::debug!(
                sessions_purged = sessions,
                rate_windows_purged = windows,
                "Expired state swept"
            );
        }
        Ok(())
    }
}
