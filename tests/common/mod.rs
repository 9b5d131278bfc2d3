#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::Value;
use tower::ServiceExt;

use tpa_admin_api::auth::{Claims, JwtIdentityProvider};
use tpa_admin_api::config::AppConfig;
use tpa_admin_api::model::TpaPatch;
use tpa_admin_api::notify::LogNotifier;
use tpa_admin_api::storage::{InMemoryObjectStore, ObjectStore};
use tpa_admin_api::{app, AppState};

pub const SECRET: &str = "integration-test-secret";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.identity.jwt_secret = SECRET.to_string();
    config.security.quote_api_key = None;
    config.notification.enabled = false;
    config.api.enable_request_logging = false;
    config
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub raw: Vec<u8>,
    pub body: Value,
}

/// The full router over in-memory stores, driven in-process
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub config_store: Arc<dyn ObjectStore>,
    pub documents: Arc<InMemoryObjectStore>,
    tokens: JwtIdentityProvider,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let config_store = Arc::new(InMemoryObjectStore::new(config.storage.config_bucket.clone()));
        Self::with_config_store(config, config_store)
    }

    /// The router over a caller-supplied store for the configuration document
    pub fn with_config_store(config: AppConfig, config_store: Arc<dyn ObjectStore>) -> Self {
        let documents = Arc::new(InMemoryObjectStore::new(config.storage.documents_bucket.clone()));
        let tokens = JwtIdentityProvider::from_config(&config.identity);

        let state = AppState::new(
            config,
            config_store.clone(),
            documents.clone(),
            Arc::new(tokens.clone()),
            Arc::new(LogNotifier),
        );

        Self {
            router: app(state.clone()),
            state,
            config_store,
            documents,
            tokens,
        }
    }

    pub fn token(&self, claims: Claims) -> String {
        self.tokens.generate_token(claims).expect("token")
    }

    pub fn admin_token(&self) -> String {
        self.token(Claims::new("admin-user", Duration::hours(1)).with_group("ADMIN"))
    }

    pub fn user_token(&self, tpa_id: &str) -> String {
        self.token(Claims::new(format!("user-{}", tpa_id), Duration::hours(1)).with_tpa(tpa_id))
    }

    pub async fn seed_tpa(&self, id: &str, name: &str) {
        self.state
            .repository
            .update_tpa(TpaPatch {
                id: id.to_string(),
                name: Some(name.to_string()),
                ..Default::default()
            })
            .await
            .expect("seed tpa");
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let raw = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body")
            .to_vec();
        let body = if raw.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&raw).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            raw,
            body,
        }
    }

    pub async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.call("GET", uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.call("POST", uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.call("DELETE", uri, token, None).await
    }
}
