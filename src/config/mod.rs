use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub identity: IdentityConfig,
    pub security: SecurityConfig,
    pub notification: NotificationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub max_request_size_bytes: usize,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    Memory,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Bucket holding the configuration document
    pub config_bucket: String,
    /// Key of the single configuration document
    pub config_key: String,
    /// Bucket receiving quote submissions
    pub documents_bucket: String,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_force_path_style: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    /// Members of this group may act on any tenant
    pub admin_group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Allowed CORS origins; the first one is used when the request origin is not listed
    pub cors_origins: Vec<String>,
    pub cors_allow_methods: String,
    pub cors_allow_headers: String,
    /// When set, `POST /quotes` requires a matching `x-api-key` header
    pub quote_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    /// Mail relay endpoint; notifications are only logged when absent
    pub webhook_url: Option<String>,
}

fn csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("API_HOST") {
            self.api.host = v;
        }
        if let Ok(v) = env::var("API_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Storage overrides
        if let Ok(v) = env::var("STORAGE_BACKEND") {
            self.storage.backend = match v.to_ascii_lowercase().as_str() {
                "s3" => StorageBackend::S3,
                "memory" => StorageBackend::Memory,
                _ => self.storage.backend,
            };
        }
        if let Ok(v) = env::var("CONFIG_BUCKET") {
            self.storage.config_bucket = v;
        }
        if let Ok(v) = env::var("CONFIG_KEY") {
            self.storage.config_key = v;
        }
        if let Ok(v) = env::var("DOCUMENTS_BUCKET") {
            self.storage.documents_bucket = v;
        }
        if let Ok(v) = env::var("S3_REGION") {
            self.storage.s3_region = non_empty(v);
        }
        if let Ok(v) = env::var("S3_ENDPOINT") {
            self.storage.s3_endpoint = non_empty(v);
        }
        if let Ok(v) = env::var("S3_FORCE_PATH_STYLE") {
            self.storage.s3_force_path_style = v.parse().unwrap_or(self.storage.s3_force_path_style);
        }

        // Identity overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.identity.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_ISSUER") {
            self.identity.jwt_issuer = non_empty(v);
        }
        if let Ok(v) = env::var("ADMIN_GROUP") {
            self.identity.admin_group = v;
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            let origins = csv(&v);
            if !origins.is_empty() {
                self.security.cors_origins = origins;
            }
        }
        if let Ok(v) = env::var("QUOTE_API_KEY") {
            self.security.quote_api_key = non_empty(v);
        }

        // Notification overrides
        if let Ok(v) = env::var("NOTIFY_ENABLED") {
            self.notification.enabled = v.parse().unwrap_or(self.notification.enabled);
        }
        if let Ok(v) = env::var("NOTIFY_FROM") {
            self.notification.from = v;
        }
        if let Ok(v) = env::var("NOTIFY_TO") {
            self.notification.to = csv(&v);
        }
        if let Ok(v) = env::var("NOTIFY_SUBJECT") {
            self.notification.subject = v;
        }
        if let Ok(v) = env::var("NOTIFY_WEBHOOK_URL") {
            self.notification.webhook_url = non_empty(v);
        }

        self
    }

    fn base_security() -> SecurityConfig {
        SecurityConfig {
            cors_origins: Vec::new(),
            cors_allow_methods: "GET, POST, PUT, DELETE, OPTIONS".to_string(),
            cors_allow_headers:
                "Content-Type,Authorization,X-Api-Key,X-Amz-Security-Token,X-Amz-Date,x-api-key".to_string(),
            quote_api_key: None,
        }
    }

    fn base_notification() -> NotificationConfig {
        NotificationConfig {
            enabled: true,
            from: "notifications@localhost".to_string(),
            to: vec!["quotes@localhost".to_string()],
            subject: "New Quote Submission Received".to_string(),
            webhook_url: None,
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                max_request_size_bytes: 20 * 1024 * 1024, // 20MB
                enable_request_logging: true,
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                config_bucket: "tpa-config-dev".to_string(),
                config_key: "tpa-config.json".to_string(),
                documents_bucket: "tpa-documents-dev".to_string(),
                s3_region: None,
                s3_endpoint: None,
                s3_force_path_style: false,
            },
            identity: IdentityConfig {
                jwt_secret: "development-secret".to_string(),
                jwt_issuer: None,
                admin_group: "ADMIN".to_string(),
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                ..Self::base_security()
            },
            notification: NotificationConfig {
                enabled: false,
                ..Self::base_notification()
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                enable_request_logging: true,
            },
            storage: StorageConfig {
                backend: StorageBackend::S3,
                config_bucket: "tpa-config-staging".to_string(),
                config_key: "tpa-config.json".to_string(),
                documents_bucket: "tpa-documents-staging".to_string(),
                s3_region: None,
                s3_endpoint: None,
                s3_force_path_style: false,
            },
            identity: IdentityConfig {
                jwt_secret: String::new(),
                jwt_issuer: None,
                admin_group: "ADMIN".to_string(),
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
                ..Self::base_security()
            },
            notification: Self::base_notification(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
                enable_request_logging: false,
            },
            storage: StorageConfig {
                backend: StorageBackend::S3,
                config_bucket: "tpa-config".to_string(),
                config_key: "tpa-config.json".to_string(),
                documents_bucket: "tpa-documents".to_string(),
                s3_region: None,
                s3_endpoint: None,
                s3_force_path_style: false,
            },
            identity: IdentityConfig {
                jwt_secret: String::new(),
                jwt_issuer: None,
                admin_group: "ADMIN".to_string(),
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
                ..Self::base_security()
            },
            notification: Self::base_notification(),
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.identity.admin_group, "ADMIN");
        assert!(!config.notification.enabled);
        assert_eq!(config.security.cors_origins[0], "http://localhost:3000");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert!(config.identity.jwt_secret.is_empty());
        assert!(!config.api.enable_request_logging);
    }

    #[test]
    fn test_csv_parsing_drops_blanks() {
        assert_eq!(csv(" a, b ,,c "), vec!["a", "b", "c"]);
        assert_eq!(non_empty("  ".to_string()), None);
    }
}
