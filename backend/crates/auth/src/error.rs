//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use derive_more::Display;
use kernel::error::{
    app_error::{AppError, FieldError},
    kind::ErrorKind,
};
use platform::password::PasswordHashError;
use platform::rate_limit::RateLimitError;
use thiserror::Error;

use crate::domain::value_object::permission_scope::PermissionScope;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Why a session token did not yield an authenticated principal
///
/// Only ever logged. Every variant renders as the same 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SessionRejection {
    /// No session cookie
    #[display("missing")]
    Missing,
    /// Cookie is not `<id>.<signature>` or the id is not a UUID
    #[display("malformed")]
    Malformed,
    /// Signature does not match
    #[display("tampered")]
    Tampered,
    /// Signed correctly but revoked or never stored
    #[display("unknown")]
    Unknown,
    /// Past its expiry
    #[display("expired")]
    Expired,
    /// Bound identity is disabled or gone
    #[display("identity_inactive")]
    IdentityInactive,
    /// Valid guest session on a member route
    #[display("guest_session")]
    GuestSession,
}

impl SessionRejection {
    /// Reason code for logs
    pub fn code(&self) -> &'static str {
        match self {
            SessionRejection::Missing => "session_missing",
            SessionRejection::Malformed => "session_malformed",
            SessionRejection::Tampered => "session_tampered",
            SessionRejection::Unknown => "session_unknown",
            SessionRejection::Expired => "session_expired",
            SessionRejection::IdentityInactive => "identity_inactive",
            SessionRejection::GuestSession => "guest_session",
        }
    }
}

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user, wrong password or disabled account
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Per-route request limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// No valid member session
    #[error("Authentication required ({0})")]
    Unauthorized(SessionRejection),

    /// Authenticated, but the role lacks the scope
    #[error("Missing permission scope: {0}")]
    Forbidden(PermissionScope),

    /// One entry per failing input field
    #[error("Validation failed for {} field(s)", .0.len())]
    ValidationFailed(Vec<FieldError>),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Single-field validation failure
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        AuthError::ValidationFailed(vec![FieldError::new(field, message.into())])
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials | AuthError::Unauthorized(_) => ErrorKind::Unauthorized,
            AuthError::RateLimitExceeded { .. } => ErrorKind::TooManyRequests,
            AuthError::Forbidden(_) => ErrorKind::Forbidden,
            AuthError::ValidationFailed(_) => ErrorKind::UnprocessableEntity,
            AuthError::NotFound(_) => ErrorKind::NotFound,
            AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Reason code for logs; never rendered to clients
    pub fn reason(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials".to_string(),
            AuthError::RateLimitExceeded { .. } => "rate_limit_exceeded".to_string(),
            AuthError::Unauthorized(rejection) => rejection.code().to_string(),
            AuthError::Forbidden(scope) => format!("missing_scope:{}", scope.code()),
            AuthError::ValidationFailed(_) => "validation_failed".to_string(),
            AuthError::NotFound(_) => "not_found".to_string(),
            AuthError::Internal(_) => "internal".to_string(),
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let err = match self {
            AuthError::InvalidCredentials => {
                AppError::unauthorized("Invalid username or password")
            }
            AuthError::RateLimitExceeded { retry_after_secs } => {
                AppError::too_many_requests("Too many requests, please try again later")
                    .with_action(format!("Retry after {} seconds", retry_after_secs))
            }
            AuthError::Unauthorized(_) => {
                AppError::unauthorized("Authentication required").with_action("Sign in to continue")
            }
            AuthError::Forbidden(_) => {
                AppError::forbidden("You do not have permission to perform this action")
            }
            AuthError::ValidationFailed(fields) => AppError::validation(fields.clone()),
            AuthError::NotFound(_) => AppError::not_found(self.to_string()),
            AuthError::Internal(msg) => AppError::internal(msg.clone()),
        };
        err.with_reason(self.reason())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let retry_after = match &self {
            AuthError::RateLimitExceeded { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let mut response = self.to_app_error().into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<PasswordHashError> for AuthError {
    fn from(err: PasswordHashError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<RateLimitError> for AuthError {
    fn from(err: RateLimitError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        AuthError::Internal(format!("blocking task failed: {}", err))
    }
}
