//! Rate Limiter Factory
//!
//! Builds one reusable [`RateLimiter`] per route. All limiters share a store
//! and the configured window; each route counts under its own key prefix.

use std::sync::Arc;
use std::time::Duration;

use platform::client::ClientKey;
use platform::rate_limit::{
    MemoryRateLimitStore, RateLimitConfig, RateLimitResult, RateLimitStore,
};

use crate::application::config::AuthConfig;
use crate::error::{AuthError, AuthResult};

pub struct RateLimiterFactory<S = MemoryRateLimitStore> {
    store: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S> RateLimiterFactory<S>
where
    S: RateLimitStore + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self { store, config }
    }

    /// Limiter for `route_id` allowing `max` requests per window
    ///
    /// A configured override for `route_id` replaces `max`.
    pub fn create(&self, route_id: &str, max: u32) -> RateLimiter<S> {
        RateLimiter {
            route_id: Arc::from(route_id),
            limit: RateLimitConfig {
                max_requests: self.config.rate_limit_for(route_id, max),
                window: self.config.rate_limit_window,
            },
            store: Arc::clone(&self.store),
        }
    }

    pub fn window(&self) -> Duration {
        self.config.rate_limit_window
    }
}

impl RateLimiterFactory<MemoryRateLimitStore> {
    pub fn in_memory(config: Arc<AuthConfig>) -> Self {
        Self::new(Arc::new(MemoryRateLimitStore::new()), config)
    }

    /// Drop windows that have fully elapsed
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired(self.config.rate_limit_window)
    }
}

/// Request counter for one route
pub struct RateLimiter<S = MemoryRateLimitStore> {
    route_id: Arc<str>,
    limit: RateLimitConfig,
    store: Arc<S>,
}

impl<S> Clone for RateLimiter<S> {
    fn clone(&self) -> Self {
        Self {
            route_id: Arc::clone(&self.route_id),
            limit: self.limit,
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> RateLimiter<S>
where
    S: RateLimitStore + Send + Sync + 'static,
{
    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn max_requests(&self) -> u32 {
        self.limit.max_requests
    }

    /// Count one request from `client`
    ///
    /// Beyond the maximum this is `RateLimitExceeded` and the caller must not
    /// run the handler.
    pub async fn check(&self, client: &ClientKey) -> AuthResult<RateLimitResult> {
        let key = format!("{}:{}", self.route_id, client);
        let result = self.store.check_and_increment(&key, &self.limit).await?;

        if result.allowed {
            Ok(result)
        } else {
            Err(AuthError::RateLimitExceeded {
                retry_after_secs: result.retry_after_secs(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn factory(overrides: &[(&str, u32)]) -> RateLimiterFactory {
        let mut config = AuthConfig::default();
        for (route, max) in overrides {
            config.rate_limit_overrides.insert(route.to_string(), *max);
        }
        RateLimiterFactory::in_memory(Arc::new(config))
    }

    fn client(ip: &str) -> ClientKey {
        ClientKey::from_ip(ip.parse::<IpAddr>().unwrap())
    }

    #[tokio::test]
    async fn rejects_after_max() {
        let limiter = factory(&[]).create("tank.code", 6);
        let me = client("203.0.113.9");

        for _ in 0..6 {
            limiter.check(&me).await.unwrap();
        }
        let err = limiter.check(&me).await.unwrap_err();
        assert!(matches!(err, AuthError::RateLimitExceeded { retry_after_secs } if retry_after_secs > 0));
    }

    #[tokio::test]
    async fn routes_and_clients_count_separately() {
        let factory = factory(&[]);
        let register = factory.create("register.submit", 1);
        let login = factory.create("login.submit", 1);

        register.check(&client("10.0.0.1")).await.unwrap();
        login.check(&client("10.0.0.1")).await.unwrap();
        register.check(&client("10.0.0.2")).await.unwrap();
        assert!(register.check(&client("10.0.0.1")).await.is_err());
    }

    #[tokio::test]
    async fn override_replaces_default_max() {
        let limiter = factory(&[("login.submit", 2)]).create("login.submit", 20);
        assert_eq!(limiter.max_requests(), 2);
    }

    #[tokio::test]
    async fn unknown_clients_share_one_bucket() {
        let limiter = factory(&[]).create("register.submit", 1);
        limiter.check(&ClientKey::unknown()).await.unwrap();
        assert!(limiter.check(&ClientKey::unknown()).await.is_err());
    }
}
