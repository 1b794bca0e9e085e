//! Webhook notifier: posts the run report as a `{"text": ...}` payload

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{NotificationConfig, WebhookConfig};
use crate::io::HttpClient;
use crate::notifier::Notifier;
use crate::report::RunReport;
use crate::tags::TagResolver;

/// Webhook notification sender with bounded retry on transport errors
pub struct WebhookNotifier {
    webhooks: Vec<WebhookConfig>,
    prefix_message: Option<String>,
    retry_attempts: u32,
    retry_delay: Duration,
    tags: Arc<dyn TagResolver>,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("webhooks", &self.webhooks.len())
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

impl WebhookNotifier {
    pub fn new(
        config: &NotificationConfig,
        tags: Arc<dyn TagResolver>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        tracing::debug!(
            "Created WebhookNotifier with {} webhooks",
            config.webhooks.len()
        );

        Self {
            webhooks: config.webhooks.clone(),
            prefix_message: config.prefix_message.clone(),
            retry_attempts: config.retry_attempts.max(1),
            retry_delay: config.retry_delay,
            tags,
            http,
        }
    }

    /// Post `payload` to `url`, retrying only when no response came back at all
    async fn deliver(&self, url: &str, payload: &serde_json::Value) -> crate::Result<()> {
        for attempt in 1..=self.retry_attempts {
            match self.http.post_json(url, payload).await {
                Ok(response) if response.status == 200 => {
                    tracing::info!("Pushed message to webhook successfully");
                    return Ok(());
                }
                Ok(response) => {
                    tracing::warn!(
                        "Could not push message to webhook: <({}) {}>",
                        response.status,
                        response.body
                    );
                    return Err(crate::WatchpostError::Notifier(format!(
                        "Webhook returned status {}: {}",
                        response.status, response.body
                    )));
                }
                Err(e) => {
                    tracing::warn!(
                        "Could not send webhook request (attempt {}/{}): {}",
                        attempt,
                        self.retry_attempts,
                        e
                    );
                    if attempt < self.retry_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(crate::WatchpostError::Notifier(format!(
            "Webhook unreachable after {} attempts",
            self.retry_attempts
        )))
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn type_name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, report: &RunReport) -> crate::Result<()> {
        if self.webhooks.is_empty() {
            tracing::info!("No webhook is specified. Skipping push.");
            return Ok(());
        }
        if report.failures.is_empty() {
            tracing::info!("No new failures to report. Skipping push.");
            return Ok(());
        }

        let prefix = self
            .prefix_message
            .as_deref()
            .map(|p| format!("{}\n", p))
            .unwrap_or_default();
        let body = report.message();

        let mut failed = Vec::new();
        for (index, webhook) in self.webhooks.iter().enumerate() {
            let mentions = self.tags.resolve(&webhook.tags).await;
            let payload = serde_json::json!({
                "text": format!("{}{}{}", prefix, mentions, body)
            });

            if let Err(e) = self.deliver(&webhook.url, &payload).await {
                tracing::warn!("Delivery to webhook #{} failed: {}", index + 1, e);
                failed.push(index + 1);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(crate::WatchpostError::Notifier(format!(
                "Delivery failed for webhooks {:?} of {}",
                failed,
                self.webhooks.len()
            )))
        }
    }
}
