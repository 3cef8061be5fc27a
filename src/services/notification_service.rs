use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification channel '{channel}' returned status: {status}")]
    Rejected { channel: String, status: u16 },

    #[error("Unknown notification channel: {0}")]
    UnknownChannel(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub channel_alias: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub name: String,
}

/// Delivers alert notifications to named channels.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;

    async fn list_channels(&self) -> Result<Vec<NotificationChannel>, NotifyError>;
}

/// Posts Slack-compatible webhook messages, one URL per channel alias.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    channels: HashMap<String, String>,
}

impl WebhookNotifier {
    pub fn new(channels: HashMap<String, String>) -> Self {
        Self {
            client: Client::new(),
            channels,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        let url = self
            .channels
            .get(&notification.channel_alias)
            .ok_or_else(|| NotifyError::UnknownChannel(notification.channel_alias.clone()))?;

        let payload = json!({
            "text": format!("*{}*\n{}", notification.subject, notification.message),
            "attachments": [{
                "color": "#FF0000",
                "title": notification.subject,
                "text": notification.message,
                "footer": "Strategy Keeper",
                "ts": chrono::Utc::now().timestamp()
            }]
        });

        let response = self.client.post(url).json(&payload).send().await?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected {
                channel: notification.channel_alias,
                status: response.status().as_u16(),
            });
        }

        info!("Notification '{}' sent to {}", notification.subject, notification.channel_alias);
        Ok(())
    }

    async fn list_channels(&self) -> Result<Vec<NotificationChannel>, NotifyError> {
        let mut names: Vec<_> = self.channels.keys().cloned().collect();
        names.sort();
        Ok(names
            .into_iter()
            .map(|name| NotificationChannel { name })
            .collect())
    }
}
