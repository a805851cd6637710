//! Seed data
//!
//! Roles and members loaded into the in-memory repository at startup.
//!
//! ```json
//! {
//!   "roles": [{ "name": "admin", "scopes": ["member", "members:manage"] }],
//!   "identities": [{ "username": "warden", "password": "…", "role": "admin" }]
//! }
//! ```
//!
//! A member may carry `passwordHash` (an Argon2 PHC string) instead of a
//! clear-text `password`. Without a `roles` list the default roles apply.

use std::path::Path;

use anyhow::{Context, bail};
use auth::AuthConfig;
use auth::MemoryAuthRepository;
use auth::models::identity::Identity;
use auth::models::identity_status::IdentityStatus;
use auth::models::permission_scope::PermissionScope;
use auth::models::role::Role;
use auth::models::user_name::UserName;
use platform::password::{ClearTextPassword, HashedPassword};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub roles: Option<Vec<Role>>,
    #[serde(default)]
    pub identities: Vec<SeedIdentity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedIdentity {
    pub username: String,
    pub password: Option<String>,
    pub password_hash: Option<String>,
    pub role: String,
    #[serde(default)]
    pub status: IdentityStatus,
}

/// Roles used when the seed defines none
pub fn default_roles() -> Vec<Role> {
    vec![
        Role::new("member", [PermissionScope::Member]),
        Role::new(
            "moderator",
            [
                PermissionScope::Member,
                PermissionScope::TanksManage,
                PermissionScope::MapsManage,
                PermissionScope::AuditsView,
            ],
        ),
        Role::new("admin", PermissionScope::ALL),
    ]
}

/// Build the repository from `path`, or with default roles only
pub fn load(path: Option<&Path>, config: &AuthConfig) -> anyhow::Result<MemoryAuthRepository> {
    let seed = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read seed file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid seed file {}", path.display()))?
        }
        None => {
            tracing::warn!("PORTAL_SEED_FILE not set, starting without members");
            Seed::default()
        }
    };

    build(seed, config)
}

pub fn build(seed: Seed, config: &AuthConfig) -> anyhow::Result<MemoryAuthRepository> {
    let repo = MemoryAuthRepository::new();

    let roles = seed.roles.unwrap_or_else(default_roles);
    let role_count = roles.len();
    let role_names: Vec<String> = roles.iter().map(|r| r.name.clone()).collect();
    for role in roles {
        repo.insert_role(role);
    }

    for member in seed.identities {
        if !role_names.contains(&member.role) {
            bail!("member {} references unknown role {}", member.username, member.role);
        }

        let credential = match (member.password, member.password_hash) {
            (_, Some(phc)) => HashedPassword::from_phc_string(phc)
                .with_context(|| format!("member {} has an invalid passwordHash", member.username))?,
            (Some(password), None) => ClearTextPassword::new(password)
                .with_context(|| format!("member {} has a weak password", member.username))?
                .hash_with(&config.password_hash, config.pepper())?,
            (None, None) => bail!("member {} has no password", member.username),
        };

        let user_name = UserName::new(&member.username)
            .with_context(|| format!("invalid user name {:?}", member.username))?;
        let mut identity = Identity::new(user_name, credential, member.role);
        identity.set_status(member.status);

        repo.insert_identity(identity)
            .with_context(|| format!("duplicate member {}", member.username))?;
    }

    tracing::info!(
        roles = role_count,
        members = repo.identity_count(),
        "Seed loaded"
    );
    Ok(repo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::password::HashParams;

    fn config() -> AuthConfig {
        AuthConfig {
            password_hash: HashParams::light(),
            ..AuthConfig::development()
        }
    }

    fn seed(json: serde_json::Value) -> Seed {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_members_and_default_roles() {
        let repo = build(
            seed(serde_json::json!({
                "identities": [
                    { "username": "Warden", "password": "Hull-down on ridge 7", "role": "admin" },
                    { "username": "scout", "password": "Tracks-and-Turrets-42", "role": "member", "status": "disabled" }
                ]
            })),
            &config(),
        )
        .unwrap();

        assert_eq!(repo.identity_count(), 2);
    }

    #[test]
    fn test_rejects_bad_members() {
        let unknown_role = seed(serde_json::json!({
            "identities": [{ "username": "scout", "password": "Tracks-and-Turrets-42", "role": "ghost" }]
        }));
        assert!(build(unknown_role, &config()).is_err());

        let weak = seed(serde_json::json!({
            "identities": [{ "username": "scout", "password": "password", "role": "member" }]
        }));
        assert!(build(weak, &config()).is_err());

        let duplicate = seed(serde_json::json!({
            "identities": [
                { "username": "scout", "password": "Tracks-and-Turrets-42", "role": "member" },
                { "username": "SCOUT", "password": "Tracks-and-Turrets-42", "role": "member" }
            ]
        }));
        assert!(build(duplicate, &config()).is_err());
    }

    #[test]
    fn test_custom_roles_replace_defaults() {
        let custom = seed(serde_json::json!({
            "roles": [{ "name": "crew", "scopes": ["member"] }],
            "identities": [{ "username": "scout", "password": "Tracks-and-Turrets-42", "role": "admin" }]
        }));
        assert!(build(custom, &config()).is_err());
    }
}
