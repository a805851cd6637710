//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_object::identity_status::IdentityStatus;
use crate::domain::value_object::permission_scope::PermissionScope;

// ============================================================================
// Login
// ============================================================================

/// Login form or JSON body
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response for API callers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub username: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Password
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// ============================================================================
// Members
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DisableMemberRequest {
    pub username: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStatusResponse {
    pub username: String,
    pub status: IdentityStatus,
}

// ============================================================================
// Session
// ============================================================================

/// Resolved session of the caller
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    /// `unauthenticated`, `guest` or `member`
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub scopes: Vec<PermissionScope>,
}
