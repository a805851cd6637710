//! Cryptographic Utilities
//!
//! Signed tokens have the shape `{payload}.{signature}` where the signature
//! is an unpadded URL-safe Base64 HMAC-SHA256 over the payload bytes.

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Signed token verification failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Not `{payload}.{signature}`, or the signature is not Base64
    #[error("token is malformed")]
    Malformed,

    /// Well-formed, but the signature does not match
    #[error("token signature mismatch")]
    BadSignature,
}

/// Generate cryptographically secure random bytes
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Encode bytes as base64
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64 to bytes
pub fn from_base64(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(s)
}

fn mac_for(key: &[u8; 32]) -> HmacSha256 {
    <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC can take key of any size")
}

/// Sign `payload`, returning `{payload}.{signature}`
pub fn sign_token(key: &[u8; 32], payload: &str) -> String {
    let mut mac = mac_for(key);
    mac.update(payload.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{}.{}", payload, signature)
}

/// Verify a signed token and return its payload
///
/// The signature comparison is constant time.
pub fn verify_token<'a>(key: &[u8; 32], token: &'a str) -> Result<&'a str, TokenError> {
    let mut parts = token.split('.');
    let (Some(payload), Some(signature), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(TokenError::Malformed);
    };
    if payload.is_empty() || signature.is_empty() {
        return Err(TokenError::Malformed);
    }
    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| TokenError::Malformed)?;

    let mut mac = mac_for(key);
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::BadSignature)?;
    Ok(payload)
}
