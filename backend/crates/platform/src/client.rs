//! Client identification utilities
//!
//! Derives the key that rate windows are counted under.

use std::fmt;
use std::net::IpAddr;

use axum::http::HeaderMap;

/// Key used when no address can be determined
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Identity of the requesting client for throttling and logs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey(String);

impl ClientKey {
    pub fn unknown() -> Self {
        Self(UNKNOWN_CLIENT.to_string())
    }

    pub fn from_ip(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract client IP address from headers
///
/// The first `X-Forwarded-For` entry is only honoured when the deployment
/// sits behind a trusted reverse proxy; otherwise any client could pick its
/// own key. Falls back to the direct connection IP.
///
/// ## Arguments
/// * `headers` - HTTP request headers
/// * `direct_ip` - Direct connection IP address
/// * `trust_proxy` - Whether `X-Forwarded-For` may be believed
pub fn extract_client_ip(
    headers: &HeaderMap,
    direct_ip: Option<IpAddr>,
    trust_proxy: bool,
) -> Option<IpAddr> {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|xff| xff.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok());
        if forwarded.is_some() {
            return forwarded;
        }
    }
    direct_ip
}

/// Resolve the [`ClientKey`] for a request
pub fn resolve_client_key(
    headers: &HeaderMap,
    direct_ip: Option<IpAddr>,
    trust_proxy: bool,
) -> ClientKey {
    extract_client_ip(headers, direct_ip, trust_proxy)
        .map(ClientKey::from_ip)
        .unwrap_or_else(ClientKey::unknown)
}
