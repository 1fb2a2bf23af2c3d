// src/services/notifier.rs

//! Alert delivery.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error};

use crate::error::{DeliveryError, Result};
use crate::models::{DiscordConfig, HttpConfig};
use crate::utils::http;

/// Delivers rendered alert messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// False when messages are dropped instead of delivered.
    fn is_enabled(&self) -> bool {
        true
    }

    async fn send(&self, message: &str) -> std::result::Result<(), DeliveryError>;
}

/// Posts messages to a Discord webhook.
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(discord: &DiscordConfig, http_config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_notify_client(http_config)?,
            webhook_url: discord.webhook_url.clone(),
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, message: &str) -> std::result::Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&json!({ "content": message }))
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        error!(status = status.as_u16(), body = %body, "Failed to send Discord notification");
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Stand-in when no webhook is configured; messages only reach the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn send(&self, message: &str) -> std::result::Result<(), DeliveryError> {
        debug!(message, "Notifier disabled; skipping message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mock_server::{Canned, MockServer};

    fn notifier(server: &MockServer) -> DiscordNotifier {
        let discord: DiscordConfig =
            toml::from_str(&format!("webhook_url = \"{}\"", server.url("/api/webhooks/1/abc")))
                .unwrap();
        DiscordNotifier::new(&discord, &HttpConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_posts_json_content() {
        let server = MockServer::start(vec![Canned::new(204, "text/plain", "")]).await;
        notifier(&server).send("@here Rappel #3").await.unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("POST /api/webhooks/1/abc "));
        assert!(requests[0].contains(r#"{"content":"@here Rappel #3"}"#));
    }

    #[tokio::test]
    async fn test_non_success_is_rejected() {
        let server =
            MockServer::start(vec![Canned::new(400, "application/json", r#"{"code":50006}"#)]).await;
        let err = notifier(&server).send("hello").await.unwrap_err();
        assert_eq!(
            err,
            DeliveryError::Rejected {
                status: 400,
                body: r#"{"code":50006}"#.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_log_notifier_is_disabled() {
        assert!(!LogNotifier.is_enabled());
        assert!(LogNotifier.send("hello").await.is_ok());
    }
}
