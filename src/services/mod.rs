pub mod config_repository;
pub mod quote_service;

pub use config_repository::{ConfigError, ConfigRepository, ConfigSnapshot};
pub use quote_service::{QuoteError, QuoteReceipt, QuoteService, QuoteSubmission, UploadedFile};
