// handlers/mod.rs - Two-tier handler layout
//
// Public (no identity needed) → Protected (caller identity resolved per request)
pub mod protected; // Tier 2: identity resolved by middleware (/api/*)
pub mod public; // Tier 1: no authentication required (/, /health, /quotes)

use axum::{
    async_trait,
    body::Bytes,
    extract::{rejection::BytesRejection, FromRequest, Request},
    http::StatusCode,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Parse a JSON request body, reporting malformed input as 400
fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::invalid_json(format!("Invalid JSON body: {}", e)))
}

fn body_rejection(rejection: BytesRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(rejection.body_text())
    } else {
        ApiError::bad_request(rejection.body_text())
    }
}

/// A JSON request body. Buffering and parse failures render as API errors.
///
/// Unlike `axum::Json` this does not insist on a `content-type` header.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(request, state).await.map_err(body_rejection)?;
        parse_json(&body).map(JsonBody)
    }
}

/// Fallback for unmatched paths and methods
pub async fn route_not_found() -> ApiError {
    ApiError::route_not_found()
}

/// Treat blank strings as absent
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
