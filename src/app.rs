use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{IdentityProvider, JwtIdentityProvider};
use crate::config::{AppConfig, StorageBackend};
use crate::handlers::{protected, public, route_not_found};
use crate::middleware::{cors_middleware, identity_middleware};
use crate::notify::{self, Notifier};
use crate::services::config_repository::ConfigRepository;
use crate::services::quote_service::QuoteService;
use crate::storage::{InMemoryObjectStore, ObjectStore};

/// Shared per-process dependencies handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repository: ConfigRepository,
    pub quotes: QuoteService,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        config_store: Arc<dyn ObjectStore>,
        documents: Arc<dyn ObjectStore>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let repository = ConfigRepository::new(config_store, config.storage.config_key.clone());
        let quotes = QuoteService::new(
            documents,
            notifier,
            config.notification.clone(),
            config.security.quote_api_key.clone(),
        );

        Self {
            config: Arc::new(config),
            repository,
            quotes,
            identity,
        }
    }

    /// Process-local stores with token verification and notifications as configured
    pub fn in_memory(config: AppConfig) -> Self {
        let config_store = Arc::new(InMemoryObjectStore::new(config.storage.config_bucket.clone()));
        let documents = Arc::new(InMemoryObjectStore::new(config.storage.documents_bucket.clone()));
        let identity = Arc::new(JwtIdentityProvider::from_config(&config.identity));
        let notifier = notify::from_config(&config.notification);

        Self::new(config, config_store, documents, identity, notifier)
    }

    /// Build the state for the storage backend named in `config`
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory object storage; data is lost on restart");
                Ok(Self::in_memory(config))
            }
            StorageBackend::S3 => Self::with_s3(config).await,
        }
    }

    #[cfg(feature = "s3")]
    async fn with_s3(config: AppConfig) -> anyhow::Result<Self> {
        use crate::storage::S3ObjectStore;

        let config_store =
            S3ObjectStore::from_config(&config.storage, config.storage.config_bucket.clone()).await;
        let documents =
            S3ObjectStore::from_config(&config.storage, config.storage.documents_bucket.clone()).await;
        let identity = Arc::new(JwtIdentityProvider::from_config(&config.identity));
        let notifier = notify::from_config(&config.notification);

        info!(
            "Using S3 object storage (config s3://{}/{}, documents s3://{})",
            config.storage.config_bucket, config.storage.config_key, config.storage.documents_bucket
        );

        Ok(Self::new(
            config,
            Arc::new(config_store),
            Arc::new(documents),
            identity,
            notifier,
        ))
    }

    #[cfg(not(feature = "s3"))]
    async fn with_s3(_config: AppConfig) -> anyhow::Result<Self> {
        anyhow::bail!("STORAGE_BACKEND=s3 requires building with the `s3` feature")
    }
}

pub fn app(state: AppState) -> Router {
    let max_body = state.config.api.max_request_size_bytes;
    let request_logging = state.config.api.enable_request_logging;

    let router = Router::new()
        .merge(public_routes())
        .merge(api_routes(&state))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(from_fn_with_state(state.clone(), cors_middleware));

    let router = if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::root).fallback(route_not_found))
        .route("/health", get(public::health).fallback(route_not_found))
        .route("/quotes", post(public::quotes::submit).fallback(route_not_found))
}

fn api_routes(state: &AppState) -> Router<AppState> {
    use protected::{brokers, employers, tpa, users};

    Router::new()
        .route(
            "/api/tpas",
            get(tpa::list).post(tpa::upsert).fallback(route_not_found),
        )
        .route("/api/tpa", get(tpa::show).fallback(route_not_found))
        .route("/api/tpa/:id", get(tpa::show_by_id).fallback(route_not_found))
        .route("/api/brokers", post(brokers::upsert).fallback(route_not_found))
        .route(
            "/api/brokers/:brokerId",
            delete(brokers::delete).fallback(route_not_found),
        )
        .route(
            "/api/brokers/:brokerId/employers/:employerId",
            delete(employers::delete).fallback(route_not_found),
        )
        .route("/api/employers", post(employers::upsert).fallback(route_not_found))
        .route("/api/users", get(users::list).fallback(route_not_found))
        .route_layer(from_fn_with_state(state.clone(), identity_middleware))
}
