//! Failure stages
//!
//! Terminal handling for responses that did not succeed, innermost first:
//! [`handle_validation_error`], [`handle_error`], then the [`not_found`]
//! fallback for unmatched routes. Each stage only touches what an earlier one
//! left alone.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::Uri;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use kernel::error::app_error::AppError;
use kernel::error::conversions::ErrorReport;
use platform::client::resolve_client_key;

use crate::application::config::AuthConfig;
use crate::presentation::request_context::RouteTag;

/// Marks a failure that has already been logged
#[derive(Debug, Clone, Copy)]
struct Logged;

fn route_of(response: &Response) -> Arc<str> {
    response
        .extensions()
        .get::<RouteTag>()
        .map(|RouteTag(route)| Arc::clone(route))
        .unwrap_or_else(|| Arc::from("-"))
}

/// Log validation failures once, field by field
pub async fn handle_validation_error(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let fields = match response.extensions().get::<ErrorReport>() {
        Some(report) if !report.fields.is_empty() => report
            .fields
            .iter()
            .map(|f| format!("{}: {}", f.field, f.message))
            .collect::<Vec<_>>(),
        _ => return response,
    };

    tracing::warn!(
        kind = "validation",
        route = %route_of(&response),
        status = response.status().as_u16(),
        fields = ?fields,
        "Request validation failed"
    );
    response.extensions_mut().insert(Logged);
    response
}

/// Log every other failed response and hide server fault internals
pub async fn handle_error(
    State(config): State<Arc<AuthConfig>>,
    req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let client_key = resolve_client_key(req.headers(), peer, config.trust_proxy);
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error())
        || response.extensions().get::<Logged>().is_some()
    {
        return response;
    }

    let route = route_of(&response);
    match response.extensions().get::<ErrorReport>() {
        Some(report) if report.kind.is_server_error() => {
            tracing::error!(
                kind = report.kind.as_str(),
                reason = report.reason.as_deref().unwrap_or("-"),
                route = %route,
                client_key = %client_key,
                detail = %report.detail,
                "Request failed"
            );
            response
        }
        Some(report) => {
            tracing::warn!(
                kind = report.kind.as_str(),
                reason = report.reason.as_deref().unwrap_or("-"),
                route = %route,
                client_key = %client_key,
                message = %report.message,
                "Request rejected"
            );
            response
        }
        None if status.is_server_error() => {
            tracing::error!(
                status = status.as_u16(),
                route = %route,
                client_key = %client_key,
                method = %method,
                path = %path,
                "Unreported server error"
            );
            AppError::internal("Unreported server error").into_response()
        }
        None => {
            tracing::warn!(
                status = status.as_u16(),
                route = %route,
                client_key = %client_key,
                method = %method,
                path = %path,
                "Request rejected"
            );
            response
        }
    }
}

/// Router fallback
pub async fn not_found(uri: Uri) -> Response {
    AppError::not_found(format!("No route for {}", uri.path()))
        .with_reason("route_not_found")
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::StatusCode;
    use axum::middleware::{from_fn, from_fn_with_state};
    use axum::routing::get;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Arc::new(AuthConfig::development());
        Router::new()
            .route("/boom", get(|| async { AppError::internal("pool exhausted").into_response() }))
            .route("/bare", get(|| async { StatusCode::BAD_GATEWAY }))
            .route("/fine", get(|| async { "fine" }))
            .fallback(not_found)
            .layer(from_fn(handle_validation_error))
            .layer(from_fn_with_state(config, handle_error))
    }

    async fn call(uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn server_errors_are_generic() {
        let (status, body) = call("/boom").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("pool exhausted"));

        let (status, body) = call("/bare").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], 500);
    }

    #[tokio::test]
    async fn unmatched_route_is_problem_json() {
        let (status, body) = call("/nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn success_untouched() {
        let (status, _) = call("/fine").await;
        assert_eq!(status, StatusCode::OK);
    }
}
