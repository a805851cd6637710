//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::collections::HashMap;
use std::time::Duration;

use platform::cookie::CookieConfig;
use platform::password::HashParams;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// Auth application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session cookie name
    pub session_cookie_name: String,
    /// Session secret key for HMAC signing (32 bytes)
    pub session_secret: [u8; 32],
    /// Session lifetime (12 hours)
    pub session_ttl: Duration,
    /// Push the expiry forward on use once half the lifetime has passed
    pub session_sliding_renewal: bool,
    /// Issue a guest session to visitors of guest pages
    pub guest_sessions: bool,
    /// Guest session lifetime (30 minutes)
    pub guest_session_ttl: Duration,
    /// Guest sessions issued per client per rate-limit window
    pub guest_sessions_per_window: u32,
    /// Whether to require Secure cookie (TLS deployment)
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Argon2id cost
    pub password_hash: HashParams,
    /// Fixed window shared by every route limiter
    pub rate_limit_window: Duration,
    /// Per-route maximum overrides, keyed by route id
    pub rate_limit_overrides: HashMap<String, u32>,
    /// Believe `X-Forwarded-For` (behind a reverse proxy)
    pub trust_proxy: bool,
    /// Where unauthenticated navigations are sent
    pub login_path: String,
    /// Where authenticated members leaving guest pages are sent
    pub member_home: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "portal_session".to_string(),
            session_secret: [0u8; 32],
            session_ttl: Duration::from_secs(12 * 3600), // 12 hours
            session_sliding_renewal: false,
            guest_sessions: true,
            guest_session_ttl: Duration::from_secs(30 * 60), // 30 minutes
            guest_sessions_per_window: 10,
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            password_pepper: None,
            password_hash: HashParams::default(),
            rate_limit_window: Duration::from_secs(15 * 60), // 15 minutes
            rate_limit_overrides: HashMap::new(),
            trust_proxy: false,
            login_path: "/login".to_string(),
            member_home: "/profile".to_string(),
        }
    }
}

impl AuthConfig {
    /// Create config with a random session secret (for development)
    pub fn with_random_secret() -> Self {
        use rand::RngCore;
        let mut secret = [0u8; 32];
        rand::rng().fill_bytes(&mut secret);
        Self {
            session_secret: secret,
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::with_random_secret()
        }
    }

    /// Session lifetime as a chrono duration
    pub fn session_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.session_ttl).unwrap_or(chrono::Duration::hours(12))
    }

    /// Guest session lifetime as a chrono duration
    pub fn guest_session_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.guest_session_ttl).unwrap_or(chrono::Duration::minutes(30))
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    /// Maximum for `route_id`, after overrides
    pub fn rate_limit_for(&self, route_id: &str, default_max: u32) -> u32 {
        self.rate_limit_overrides
            .get(route_id)
            .copied()
            .unwrap_or(default_max)
    }

    /// Cookie attributes for the session cookie
    pub fn session_cookie(&self) -> CookieConfig {
        CookieConfig {
            name: self.session_cookie_name.clone(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: self.cookie_same_site,
            path: "/".to_string(),
            max_age_secs: Some(i64::try_from(self.session_ttl.as_secs()).unwrap_or(i64::MAX)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_secret_is_not_zero() {
        let config = AuthConfig::with_random_secret();
        assert_ne!(config.session_secret, [0u8; 32]);
        assert!(config.cookie_secure);
    }

    #[test]
    fn test_development_cookie_is_insecure() {
        let config = AuthConfig::development();
        assert!(!config.session_cookie().build_set_cookie("x").contains("Secure"));
    }

    #[test]
    fn test_rate_limit_override() {
        let mut config = AuthConfig::default();
        config
            .rate_limit_overrides
            .insert("login.submit".to_string(), 5);

        assert_eq!(config.rate_limit_for("login.submit", 20), 5);
        assert_eq!(config.rate_limit_for("tank.submit", 20), 20);
    }

    #[test]
    fn test_session_cookie_max_age_matches_ttl() {
        let config = AuthConfig::default();
        let cookie = config.session_cookie().build_set_cookie("token");
        assert!(cookie.contains("Max-Age=43200"));
        assert!(cookie.starts_with("portal_session=token"));
    }

    #[test]
    fn test_session_cookie_max_age_saturates() {
        let config = AuthConfig {
            session_ttl: Duration::from_secs(u64::MAX),
            ..AuthConfig::default()
        };
        assert_eq!(config.session_cookie().max_age_secs, Some(i64::MAX));
    }
}
