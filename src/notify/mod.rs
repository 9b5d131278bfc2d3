//! Outbound notifications for new quote submissions.

pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::NotificationConfig;

pub use webhook::WebhookNotifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification relay rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Notification transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `message`. Returns the relay's message id when it was actually sent.
    async fn send(&self, message: &EmailMessage) -> Result<Option<String>, NotifyError>;
}

/// Records notifications in the log without delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<Option<String>, NotifyError> {
        info!(
            "Notification not delivered (no relay configured): '{}' to {}",
            message.subject,
            message.to.join(", ")
        );
        Ok(None)
    }
}

/// Pick the notifier matching `config`: a webhook relay when a valid URL is set, the log otherwise.
pub fn from_config(config: &NotificationConfig) -> Arc<dyn Notifier> {
    match (&config.webhook_url, config.enabled) {
        (Some(url), true) => match url::Url::parse(url) {
            Ok(url) => Arc::new(WebhookNotifier::new(url.as_str())),
            Err(e) => {
                warn!("Ignoring invalid notification relay URL {}: {}", url, e);
                Arc::new(LogNotifier)
            }
        },
        _ => Arc::new(LogNotifier),
    }
}
