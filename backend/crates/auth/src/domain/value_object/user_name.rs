//! User Name Value Object
//!
//! The login identifier. Stored and compared in canonical form:
//! NFKC normalization, then trimming, then lowercasing.
//!
//! ## Invariants
//! - Length: 3 to 30 characters (after canonicalization)
//! - No whitespace or control characters inside the name

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Minimum length for user name (in characters)
pub const USER_NAME_MIN_LENGTH: usize = 3;

/// Maximum length for user name (in characters)
pub const USER_NAME_MAX_LENGTH: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserNameError {
    #[error("must be between {min} and {max} characters")]
    Length { min: usize, max: usize },

    #[error("must not contain whitespace or control characters")]
    InvalidCharacter,
}

/// Canonical user name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserName(String);

impl UserName {
    /// Canonicalize and validate a new user name
    pub fn new(raw: &str) -> Result<Self, UserNameError> {
        let canonical = canonicalize(raw);
        let len = canonical.chars().count();

        if !(USER_NAME_MIN_LENGTH..=USER_NAME_MAX_LENGTH).contains(&len) {
            return Err(UserNameError::Length {
                min: USER_NAME_MIN_LENGTH,
                max: USER_NAME_MAX_LENGTH,
            });
        }
        if canonical
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(UserNameError::InvalidCharacter);
        }

        Ok(Self(canonical))
    }

    /// Canonical form of a submitted login identifier
    ///
    /// No validation: a name that could never have been registered simply
    /// finds nothing. Returns `None` for blank input.
    pub fn lookup_key(raw: &str) -> Option<Self> {
        let canonical = canonicalize(raw);
        (!canonical.is_empty()).then_some(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn canonicalize(raw: &str) -> String {
    let normalized: String = raw.nfkc().collect();
    normalized.trim().to_lowercase()
}

impl TryFrom<String> for UserName {
    type Error = UserNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<UserName> for String {
    fn from(name: UserName) -> Self {
        name.0
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
