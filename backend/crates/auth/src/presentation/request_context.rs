//! Per-request context
//!
//! Inserted by the route chain after the gate admits a request and read by
//! handlers through the [`RequestContext`] extractor.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use platform::client::ClientKey;

use crate::application::access_gate::{RequestShape, SessionState};
use crate::domain::entity::identity::Identity;
use crate::error::{AuthError, AuthResult, SessionRejection};

#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Route id from the route table
    pub route: Arc<str>,
    pub client_key: ClientKey,
    pub shape: RequestShape,
    pub session: SessionState,
    /// Session token the request carries, or the guest token just issued
    pub token: Option<String>,
}

impl RequestContext {
    /// The signed-in member, or `Unauthorized`
    pub fn member(&self) -> AuthResult<&Identity> {
        match &self.session {
            SessionState::Member { identity, .. } => Ok(identity),
            SessionState::Unauthenticated(rejection) => Err(AuthError::Unauthorized(*rejection)),
            SessionState::Guest { .. } => {
                Err(AuthError::Unauthorized(SessionRejection::GuestSession))
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| AuthError::Internal("route registered outside the route table".to_string()))
    }
}

/// Route id attached to every response a route chain produced
#[derive(Debug, Clone)]
pub struct RouteTag(pub Arc<str>);

/// 302 Found to `location`
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => AuthError::Internal(format!("invalid redirect target {location:?}")).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_sets_location() {
        let response = found("/profile");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/profile");
    }

    #[test]
    fn member_requires_member_session() {
        let ctx = RequestContext {
            route: Arc::from("test"),
            client_key: ClientKey::unknown(),
            shape: RequestShape::Api,
            session: SessionState::Unauthenticated(SessionRejection::Expired),
            token: None,
        };
        assert!(matches!(
            ctx.member(),
            Err(AuthError::Unauthorized(SessionRejection::Expired))
        ));
    }
}
