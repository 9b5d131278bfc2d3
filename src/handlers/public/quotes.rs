use axum::{
    body::to_bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderMap, StatusCode},
};
use serde_json::Value;
use tracing::debug;

use crate::app::AppState;
use crate::auth::Identity;
use crate::error::ApiError;
use crate::middleware::{bearer_token, ApiResponse, ApiResult};
use crate::services::quote_service::{QuoteReceipt, QuoteService, QuoteSubmission, UploadedFile};

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(err.body_text())
    } else {
        ApiError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Token claims are optional here; an unverifiable token just means no identity.
async fn optional_identity(state: &AppState, headers: &HeaderMap) -> Option<Identity> {
    let token = bearer_token(headers).ok()?;
    match state.identity.introspect(&token).await {
        Ok(identity) => Some(identity),
        Err(e) => {
            debug!("Ignoring unverifiable token on quote submission: {}", e);
            None
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<QuoteSubmission, ApiError> {
    let mut submission = QuoteSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let content = field.bytes().await.map_err(multipart_error)?;
                debug!("Parsed file {} ({} bytes, {})", filename, content.len(), content_type);

                submission.files.push(UploadedFile {
                    field: name,
                    filename,
                    content_type,
                    content,
                });
            }
            None => {
                let value = field.text().await.map_err(multipart_error)?;
                submission.fields.insert(name, Value::String(value));
            }
        }
    }

    Ok(submission)
}

/// POST /quotes - Accept a quote submission (multipart with files, or JSON)
pub async fn submit(State(state): State<AppState>, request: Request) -> ApiResult<QuoteReceipt> {
    let headers = request.headers().clone();

    let api_key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    state.quotes.check_api_key(api_key)?;

    let identity = optional_identity(&state, &headers).await;

    let receipt = if is_multipart(&headers) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        let submission = read_multipart(multipart).await?;
        state.quotes.submit_multipart(submission, identity.as_ref()).await
    } else {
        let body = to_bytes(request.into_body(), state.config.api.max_request_size_bytes)
            .await
            .map_err(|e| ApiError::payload_too_large(format!("Failed to read request body: {}", e)))?;
        let fields = QuoteService::parse_json_fields(&body)?;
        state.quotes.submit_json(fields, identity.as_ref()).await
    };

    Ok(ApiResponse::success(receipt))
}
