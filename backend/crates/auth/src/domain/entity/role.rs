//! Role Entity

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::value_object::permission_scope::PermissionScope;

/// Named set of permission scopes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub scopes: BTreeSet<PermissionScope>,
}

impl Role {
    pub fn new(name: impl Into<String>, scopes: impl IntoIterator<Item = PermissionScope>) -> Self {
        Self {
            name: name.into(),
            scopes: scopes.into_iter().collect(),
        }
    }

    /// Role with no scopes, used when an identity points at a missing role
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, [])
    }

    pub fn grants(&self, scope: PermissionScope) -> bool {
        self.scopes.contains(&scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grants() {
        let role = Role::new(
            "curator",
            [PermissionScope::Member, PermissionScope::TanksManage],
        );
        assert!(role.grants(PermissionScope::TanksManage));
        assert!(!role.grants(PermissionScope::SettingsManage));
        assert!(!Role::empty("ghost").grants(PermissionScope::Member));
    }

    #[test]
    fn test_scopes_are_ordered_and_deduplicated() {
        let role = Role::new(
            "admin",
            [
                PermissionScope::SettingsManage,
                PermissionScope::Member,
                PermissionScope::Member,
            ],
        );
        let codes: Vec<_> = role.scopes.iter().map(|s| s.code()).collect();
        assert_eq!(codes, vec!["member", "settings:manage"]);
    }
}
