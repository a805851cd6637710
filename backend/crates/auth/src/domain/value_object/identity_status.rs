//! Identity Status Value Object
//!
//! Members are never hard-deleted. Deleting a member disables it, which also
//! invalidates every session it still holds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStatus {
    /// Normal account - can sign in
    #[default]
    Active,

    /// Soft-deleted or suspended - cannot sign in, sessions are void
    Disabled,
}

impl IdentityStatus {
    /// Get string code for serialization/API
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Disabled => "disabled",
        }
    }

    /// Check if sign-in and session use are allowed
    #[inline]
    pub const fn can_authenticate(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for IdentityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_code() {
        assert_eq!(IdentityStatus::Active.to_string(), "active");
        assert_eq!(IdentityStatus::Disabled.to_string(), "disabled");
    }

    #[test]
    fn test_can_authenticate() {
        assert!(IdentityStatus::Active.can_authenticate());
        assert!(!IdentityStatus::Disabled.can_authenticate());
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&IdentityStatus::Disabled).unwrap();
        assert_eq!(json, "\"disabled\"");
        let status: IdentityStatus = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(status, IdentityStatus::Active);
    }
}
