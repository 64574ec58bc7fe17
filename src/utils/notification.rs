use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::db::models::requests::RequestStatus;

/// Result type for notification operations
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur while delivering a notification
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Webhook delivery failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Webhook rejected notification with status {0}")]
    Rejected(reqwest::StatusCode),
}

/// Events published after a workflow write commits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum NotificationEvent {
    #[serde(rename_all = "camelCase")]
    VersionSaved {
        request_id: String,
        version: i64,
        recipients: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        request_id: String,
        status: RequestStatus,
        recipients: Vec<String>,
    },
}

impl NotificationEvent {
    pub fn request_id(&self) -> &str {
        match self {
            NotificationEvent::VersionSaved { request_id, .. }
            | NotificationEvent::StatusChanged { request_id, .. } => request_id,
        }
    }

    pub fn recipients(&self) -> &[String] {
        match self {
            NotificationEvent::VersionSaved { recipients, .. }
            | NotificationEvent::StatusChanged { recipients, .. } => recipients,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, event: &NotificationEvent) -> NotificationResult<()>;
}

/// Writes events to the log. Used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, event: &NotificationEvent) -> NotificationResult<()> {
        tracing::info!(
            request_id = event.request_id(),
            recipients = ?event.recipients(),
            "notification: {:?}",
            event
        );
        Ok(())
    }
}

/// POSTs each event as JSON to a fixed URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> NotificationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, event: &NotificationEvent) -> NotificationResult<()> {
        let response = self.client.post(&self.url).json(event).send().await?;
        if !response.status().is_success() {
            return Err(NotificationError::Rejected(response.status()));
        }
        Ok(())
    }
}

/// Fire-and-forget front for a [`Notifier`]. Delivery failures are logged and
/// never reach the caller.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Webhook delivery when a URL is configured, log-only otherwise.
    pub fn from_webhook_url(url: Option<&str>) -> NotificationResult<Self> {
        let notifier: Arc<dyn Notifier> = match url {
            Some(url) => Arc::new(WebhookNotifier::new(url)?),
            None => Arc::new(LogNotifier),
        };
        Ok(Self::new(notifier))
    }

    pub fn notify_version_saved(&self, request_id: &str, version: i64, recipients: Vec<String>) {
        self.dispatch(NotificationEvent::VersionSaved {
            request_id: request_id.to_string(),
            version,
            recipients,
        });
    }

    pub fn notify_status_changed(
        &self,
        request_id: &str,
        status: RequestStatus,
        recipients: Vec<String>,
    ) {
        self.dispatch(NotificationEvent::StatusChanged {
            request_id: request_id.to_string(),
            status,
            recipients,
        });
    }

    fn dispatch(&self, event: NotificationEvent) {
        if event.recipients().is_empty() {
            tracing::debug!("no recipients for {}, skipping notification", event.request_id());
            return;
        }
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&event).await {
                tracing::warn!(
                    request_id = event.request_id(),
                    "failed to deliver notification: {}",
                    e
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<NotificationEvent>>);

    #[async_trait]
    impl Notifier for Recording {
        async fn send(&self, event: &NotificationEvent) -> NotificationResult<()> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let event = NotificationEvent::StatusChanged {
            request_id: "N_01012025_001".into(),
            status: RequestStatus::PendingSiva,
            recipients: vec!["siva@example.com".into()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "status-changed");
        assert_eq!(json["requestId"], "N_01012025_001");
        assert_eq!(json["status"], "pending-siva");
    }

    #[tokio::test]
    async fn dispatcher_delivers_in_background() {
        let recording = Arc::new(Recording::default());
        let dispatcher = NotificationDispatcher::new(recording.clone());

        dispatcher.notify_version_saved("N_01012025_001", 2, vec!["a@example.com".into()]);
        dispatcher.notify_version_saved("N_01012025_001", 3, vec![]);

        for _ in 0..50 {
            if !recording.0.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let events = recording.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], NotificationEvent::VersionSaved { version: 2, .. }));
    }
}
