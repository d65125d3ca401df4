//! Outbound alert channel (C10): posts a plain-text payload to a webhook
//! URL (Slack/Discord-compatible `{"text": "..."}` body). A missing
//! `WEBHOOK_URL` degrades to a no-op logger rather than an error, since
//! alerting is best-effort and must never block the trading loop.

use crate::domain::ports::Notifier;
use anyhow::Result;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use tracing::{info, warn};

use crate::infrastructure::core::http_client_factory::HttpClientFactory;

pub struct WebhookNotifier {
    client: ClientWithMiddleware,
    webhook_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: HttpClientFactory::create_client(),
            webhook_url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            info!(message, "notify (no webhook configured)");
            return Ok(());
        };

        let payload = serde_json::json!({ "text": message });
        if let Err(e) = self.client.post(url).json(&payload).send().await {
            warn!(error = %e, "failed to deliver webhook notification");
        }
        Ok(())
    }
}
