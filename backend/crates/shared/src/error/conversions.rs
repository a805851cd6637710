//! Error conversions - From implementations for common error types
//!
//! Provides automatic conversion from common error types to [`AppError`],
//! and the HTTP rendering of [`AppError`] when the `axum` feature is on.

use super::app_error::AppError;
use super::kind::ErrorKind;

// ============================================================================
// Standard library conversions
// ============================================================================

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::Forbidden,
            _ => ErrorKind::InternalServerError,
        };
        AppError::new(kind, "I/O operation failed").with_source(err)
    }
}

// ============================================================================
// serde_json conversions
// ============================================================================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() || err.is_eof() {
            AppError::bad_request("Malformed JSON body").with_source(err)
        } else {
            AppError::internal("JSON serialization error").with_source(err)
        }
    }
}

// ============================================================================
// Axum conversions (feature-gated)
// ============================================================================

/// What the failure stages need to log a rendered error
///
/// Attached to every error response as an extension. The response body of a
/// server error never carries the message or the source chain, so this is
/// the only place they survive.
#[cfg(feature = "axum")]
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    pub reason: Option<String>,
    pub fields: Vec<super::app_error::FieldError>,
    pub detail: String,
}

#[cfg(feature = "axum")]
impl ErrorReport {
    pub fn of(err: &AppError) -> Self {
        Self {
            kind: err.kind(),
            message: err.message().to_string(),
            reason: err.reason().map(str::to_string),
            fields: err.fields().to_vec(),
            detail: err.detail(),
        }
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;
        use axum::http::StatusCode;

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Server faults are described generically; internals stay in the report.
        let detail = if self.is_server_error() {
            self.kind().as_str()
        } else {
            self.message()
        };

        // RFC 7807 Problem Details for HTTP APIs
        let mut body = serde_json::json!({
            "type": format!("https://httpstatuses.io/{}", self.status_code()),
            "title": self.kind().as_str(),
            "status": self.status_code(),
            "code": self.kind().code(),
            "detail": detail,
            "action": self.action(),
        });
        if !self.fields().is_empty() {
            body["errors"] = serde_json::json!(self.fields());
        }

        let report = ErrorReport::of(&self);
        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert_eq!(app_err.kind(), ErrorKind::NotFound);

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let app_err: AppError = io_err.into();
        assert_eq!(app_err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let app_err: AppError = json_err.into();
        assert_eq!(app_err.kind(), ErrorKind::BadRequest);
    }

    #[cfg(feature = "axum")]
    mod response_tests {
        use super::super::ErrorReport;
        use crate::error::app_error::{AppError, FieldError};
        use axum::body::to_bytes;
        use axum::response::IntoResponse;

        async fn body_json(err: AppError) -> (u16, serde_json::Value, Option<ErrorReport>) {
            let response = err.into_response();
            let status = response.status().as_u16();
            let report = response.extensions().get::<ErrorReport>().cloned();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, serde_json::from_slice(&bytes).unwrap(), report)
        }

        #[tokio::test]
        async fn server_error_body_hides_internals() {
            let io_err = std::io::Error::other("connection string postgres://secret");
            let err = AppError::internal("Seed load exploded").with_source(io_err);

            let (status, body, report) = body_json(err).await;
            assert_eq!(status, 500);
            let text = body.to_string();
            assert!(!text.contains("secret"));
            assert!(!text.contains("exploded"));
            assert_eq!(body["code"], "internal_fault");

            let report = report.unwrap();
            assert!(report.detail.contains("postgres://secret"));
        }

        #[tokio::test]
        async fn validation_body_lists_fields() {
            let err = AppError::validation(vec![
                FieldError::new("username", "is required"),
                FieldError::new("password", "is required"),
            ]);

            let (status, body, _) = body_json(err).await;
            assert_eq!(status, 422);
            assert_eq!(body["errors"].as_array().unwrap().len(), 2);
            assert_eq!(body["errors"][0]["field"], "username");
        }

        #[tokio::test]
        async fn client_error_keeps_message_and_reason_stays_internal() {
            let err = AppError::unauthorized("Authentication required")
                .with_reason("session_tampered");

            let (status, body, report) = body_json(err).await;
            assert_eq!(status, 401);
            assert_eq!(body["detail"], "Authentication required");
            assert!(!body.to_string().contains("session_tampered"));
            assert_eq!(report.unwrap().reason.as_deref(), Some("session_tampered"));
        }
    }
}
