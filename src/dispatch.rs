// Notification sinks: webhook delivery for deployments with a chat
// integration, log-only delivery for everything else.

use std::time::Duration;

use async_trait::async_trait;

use crate::notify::{DispatchError, Notification, NotificationSink};

/// Outbound webhook request budget.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs the plain-data notification as JSON to a configured webhook.
/// The receiving side owns message formatting and channel routing.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| DispatchError(e.to_string()))?;
        if !response.status().is_success() {
            return Err(DispatchError(format!(
                "webhook returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Fallback sink when no webhook is configured: transitions only reach
/// the log.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), DispatchError> {
        tracing::info!(
            transition = notification.transition.label(),
            source = %notification.status.source,
            players = notification.status.player_names.len(),
            "status notification (no webhook configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Transition;
    use crate::status::{ServerStatus, StatusSource};

    #[tokio::test]
    async fn test_log_sink_always_succeeds() {
        let notification = Notification {
            transition: Transition::WentOffline,
            status: ServerStatus::offline(StatusSource::Unknown),
        };
        assert!(LogSink.deliver(&notification).await.is_ok());
    }

    #[test]
    fn test_notification_payload_shape() {
        let notification = Notification {
            transition: Transition::CameOnline,
            status: ServerStatus::online(
                StatusSource::Secondary,
                vec!["Alex".into()],
                Some(1),
                Some(20),
                Some("Termite SMP".into()),
            ),
        };
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["transition"], "came_online");
        assert_eq!(json["status"]["source"], "secondary");
        assert_eq!(json["status"]["player_names"][0], "Alex");
    }
}
