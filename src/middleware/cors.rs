use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::config::SecurityConfig;

/// The origin to echo back: the request origin when allow-listed, else the first allowed origin.
pub fn allowed_origin<'a>(security: &'a SecurityConfig, origin: Option<&'a str>) -> Option<&'a str> {
    match origin {
        Some(origin) if security.cors_origins.iter().any(|o| o == origin) => Some(origin),
        _ => security.cors_origins.first().map(String::as_str),
    }
}

fn apply_cors_headers(headers: &mut HeaderMap, security: &SecurityConfig, origin: Option<&str>) {
    if let Some(value) = allowed_origin(security, origin).and_then(|o| HeaderValue::from_str(o).ok()) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    }
    if let Ok(value) = HeaderValue::from_str(&security.cors_allow_methods) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
    }
    if let Ok(value) = HeaderValue::from_str(&security.cors_allow_headers) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
}

/// Answers every `OPTIONS` request before routing and decorates all responses with CORS headers
pub async fn cors_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };

    apply_cors_headers(response.headers_mut(), &state.config.security, origin.as_deref());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn listed_origin_is_echoed_and_others_fall_back() {
        let security = AppConfig::development().security;

        assert_eq!(
            allowed_origin(&security, Some("http://localhost:5173")),
            Some("http://localhost:5173")
        );
        assert_eq!(
            allowed_origin(&security, Some("https://evil.example")),
            Some("http://localhost:3000")
        );
        assert_eq!(allowed_origin(&security, None), Some("http://localhost:3000"));
    }
}
