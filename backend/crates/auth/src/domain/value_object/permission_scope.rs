//! Permission Scope Value Object
//!
//! Capabilities a role can grant. Ordered so a role's scope set has a stable
//! iteration order in logs and API output.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PermissionScope {
    #[serde(rename = "member")]
    Member,
    #[serde(rename = "tanks:manage")]
    TanksManage,
    #[serde(rename = "maps:manage")]
    MapsManage,
    #[serde(rename = "members:manage")]
    MembersManage,
    #[serde(rename = "roles:manage")]
    RolesManage,
    #[serde(rename = "audits:view")]
    AuditsView,
    #[serde(rename = "settings:manage")]
    SettingsManage,
}

impl PermissionScope {
    pub const ALL: [PermissionScope; 7] = [
        PermissionScope::Member,
        PermissionScope::TanksManage,
        PermissionScope::MapsManage,
        PermissionScope::MembersManage,
        PermissionScope::RolesManage,
        PermissionScope::AuditsView,
        PermissionScope::SettingsManage,
    ];

    #[inline]
    pub const fn code(&self) -> &'static str {
        use PermissionScope::*;
        match self {
            Member => "member",
            TanksManage => "tanks:manage",
            MapsManage => "maps:manage",
            MembersManage => "members:manage",
            RolesManage => "roles:manage",
            AuditsView => "audits:view",
            SettingsManage => "settings:manage",
        }
    }
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_is_its_serde_name() {
        for scope in PermissionScope::ALL {
            let json = serde_json::to_string(&scope).unwrap();
            assert_eq!(json, format!("\"{}\"", scope.code()));
        }
    }

    #[test]
    fn test_serde_matches_code() {
        let json = serde_json::to_string(&PermissionScope::AuditsView).unwrap();
        assert_eq!(json, "\"audits:view\"");
        let scope: PermissionScope = serde_json::from_str("\"roles:manage\"").unwrap();
        assert_eq!(scope, PermissionScope::RolesManage);
    }
}
