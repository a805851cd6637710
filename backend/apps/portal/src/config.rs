//! Portal Configuration
//!
//! Built once at startup from the environment (after `.env` is loaded) and
//! shared read-only afterwards.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use auth::AuthConfig;
use platform::crypto::from_base64;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:31113";
const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:40922,http://127.0.0.1:40922";

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    /// Origins allowed by CORS
    pub frontend_origins: Vec<String>,
    /// JSON file with roles and members
    pub seed_file: Option<PathBuf>,
    /// How often expired sessions and rate windows are swept
    pub cleanup_interval: Duration,
    pub auth: AuthConfig,
}

impl PortalConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let env = Env(&lookup);

        let session_secret = match env.get("SESSION_SECRET") {
            Some(encoded) => decode_secret(&encoded)?,
            None if cfg!(debug_assertions) => {
                tracing::warn!("SESSION_SECRET not set, using a random secret");
                AuthConfig::with_random_secret().session_secret
            }
            None => bail!("SESSION_SECRET must be set in production"),
        };

        let defaults = AuthConfig::default();
        let mut password_hash = defaults.password_hash;
        if let Some(memory_kib) = env.parse("PASSWORD_HASH_MEMORY_KIB")? {
            password_hash.memory_kib = memory_kib;
        }
        if let Some(iterations) = env.parse("PASSWORD_HASH_ITERATIONS")? {
            password_hash.iterations = iterations;
        }

        let auth = AuthConfig {
            session_secret,
            session_ttl: env
                .parse("SESSION_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
            session_sliding_renewal: env
                .flag("SESSION_SLIDING_RENEWAL")?
                .unwrap_or(defaults.session_sliding_renewal),
            guest_session_ttl: env
                .parse("GUEST_SESSION_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.guest_session_ttl),
            guest_sessions_per_window: env
                .parse("GUEST_SESSIONS_PER_WINDOW")?
                .unwrap_or(defaults.guest_sessions_per_window),
            cookie_secure: env.flag("COOKIE_SECURE")?.unwrap_or(defaults.cookie_secure),
            trust_proxy: env.flag("TRUST_PROXY")?.unwrap_or(defaults.trust_proxy),
            rate_limit_window: env
                .parse("RATE_LIMIT_WINDOW_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_window),
            rate_limit_overrides: match env.get("RATE_LIMIT_OVERRIDES") {
                Some(raw) => parse_overrides(&raw)?,
                None => defaults.rate_limit_overrides.clone(),
            },
            password_pepper: env.get("PASSWORD_PEPPER").map(String::into_bytes),
            password_hash,
            ..defaults
        };

        Ok(Self {
            bind_addr: env
                .get("PORTAL_BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
                .parse()
                .context("PORTAL_BIND_ADDR is not a socket address")?,
            frontend_origins: env
                .get("FRONTEND_ORIGINS")
                .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGINS.to_string())
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect(),
            seed_file: env.get("PORTAL_SEED_FILE").map(PathBuf::from),
            cleanup_interval: Duration::from_secs(
                env.parse("PORTAL_CLEANUP_INTERVAL_SECS")?.unwrap_or(300),
            ),
            auth,
        })
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn parse<T>(&self, name: &str) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.get(name)
            .map(|v| v.trim().parse::<T>())
            .transpose()
            .with_context(|| format!("{name} is invalid"))
    }

    fn flag(&self, name: &str) -> anyhow::Result<Option<bool>> {
        match self.get(name).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(None),
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(Some(true)),
            Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(Some(false)),
            Some(v) => bail!("{name} must be a boolean, got {v:?}"),
        }
    }
}

fn decode_secret(encoded: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = from_base64(encoded.trim()).context("SESSION_SECRET is not valid base64")?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| anyhow::anyhow!("SESSION_SECRET must decode to 32 bytes, got {}", bytes.len()))
}

/// `route.id=max,route.id=max`
fn parse_overrides(raw: &str) -> anyhow::Result<std::collections::HashMap<String, u32>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (route, max) = pair
                .split_once('=')
                .with_context(|| format!("RATE_LIMIT_OVERRIDES entry {pair:?} is not route=max"))?;
            let max = max
                .trim()
                .parse::<u32>()
                .with_context(|| format!("RATE_LIMIT_OVERRIDES entry {pair:?} has an invalid max"))?;
            Ok((route.trim().to_string(), max))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<PortalConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PortalConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr.port(), 31113);
        assert_eq!(config.frontend_origins.len(), 2);
        assert!(config.seed_file.is_none());
        assert!(config.auth.cookie_secure);
        assert!(!config.auth.trust_proxy);
    }

    #[test]
    fn test_overrides_and_flags() {
        let config = load(&[
            ("RATE_LIMIT_OVERRIDES", "login.submit=5, tanks.code=2"),
            ("TRUST_PROXY", "true"),
            ("COOKIE_SECURE", "0"),
            ("SESSION_TTL_SECS", "60"),
            ("GUEST_SESSION_TTL_SECS", "120"),
            ("GUEST_SESSIONS_PER_WINDOW", "4"),
        ])
        .unwrap();

        assert_eq!(config.auth.rate_limit_for("login.submit", 20), 5);
        assert_eq!(config.auth.rate_limit_for("tanks.code", 6), 2);
        assert_eq!(config.auth.rate_limit_for("map.download", 30), 30);
        assert!(config.auth.trust_proxy);
        assert!(!config.auth.cookie_secure);
        assert_eq!(config.auth.session_ttl, Duration::from_secs(60));
        assert_eq!(config.auth.guest_session_ttl, Duration::from_secs(120));
        assert_eq!(config.auth.guest_sessions_per_window, 4);
    }

    #[test]
    fn test_session_secret() {
        let encoded = platform::crypto::to_base64(&[7u8; 32]);
        let config = load(&[("SESSION_SECRET", &encoded)]).unwrap();
        assert_eq!(config.auth.session_secret, [7u8; 32]);

        let short = platform::crypto::to_base64(&[7u8; 16]);
        assert!(load(&[("SESSION_SECRET", &short)]).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(load(&[("TRUST_PROXY", "maybe")]).is_err());
        assert!(load(&[("SESSION_TTL_SECS", "soon")]).is_err());
        assert!(load(&[("RATE_LIMIT_OVERRIDES", "login.submit")]).is_err());
    }
}
