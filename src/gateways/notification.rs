//! Fire-and-forget delivery of lifecycle events to users.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::services::events::DomainEvent;

#[derive(Debug, thiserror::Error)]
#[error("Notification delivery failed: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user_id: Uuid, event: &DomainEvent) -> Result<(), NotifyError>;
}

/// Writes notifications to the trace log only.
#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify(&self, user_id: Uuid, event: &DomainEvent) -> Result<(), NotifyError> {
        tracing::info!(user_id = %user_id, event = event.name(), "Notification");
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    user_id: Uuid,
    event: &'a DomainEvent,
}

/// Posts each notification as JSON to a webhook.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| NotifyError(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn notify(&self, user_id: Uuid, event: &DomainEvent) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { user_id, event })
            .send()
            .await
            .map_err(|e| NotifyError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError(format!("webhook returned {}", response.status())));
        }
        Ok(())
    }
}

/// Delivers every event to its recipient. Failures are logged and dropped.
pub async fn dispatch_events(sink: &Arc<dyn NotificationSink>, events: &[DomainEvent]) {
    for event in events {
        if let Err(e) = sink.notify(event.recipient(), event).await {
            tracing::warn!(
                error = %e,
                event = event.name(),
                user_id = %event.recipient(),
                "Dropping undeliverable notification"
            );
        }
    }
}
