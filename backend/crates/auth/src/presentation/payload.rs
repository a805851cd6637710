//! Request body extractor accepting JSON or HTML form posts

use axum::extract::{FromRequest, Request};
use axum::http::header;
use axum::{Form, Json};
use serde::de::DeserializeOwned;

use crate::error::AuthError;

/// Deserialized request body
///
/// `application/x-www-form-urlencoded` bodies are read as a form, anything
/// else as JSON. Unparseable bodies fail validation on field `body`.
#[derive(Debug)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            Form::<T>::from_request(req, state)
                .await
                .map(|Form(value)| Payload(value))
                .map_err(|e| AuthError::field("body", e.body_text()))
        } else {
            Json::<T>::from_request(req, state)
                .await
                .map(|Json(value)| Payload(value))
                .map_err(|e| AuthError::field("body", e.body_text()))
        }
    }
}
