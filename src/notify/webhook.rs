use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use super::{EmailMessage, Notifier, NotifyError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RelayResponse {
    message_id: Option<String>,
}

/// Hands messages to an HTTP mail relay as JSON
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<Option<String>, NotifyError> {
        let response = self.client.post(&self.url).json(message).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        // Relays that answer with an empty or non-JSON body still count as delivered
        let message_id = response
            .json::<RelayResponse>()
            .await
            .ok()
            .and_then(|r| r.message_id)
            .unwrap_or_else(|| format!("webhook-{}", Uuid::new_v4()));

        debug!("Notification relayed to {} as {}", self.url, message_id);
        Ok(Some(message_id))
    }
}
