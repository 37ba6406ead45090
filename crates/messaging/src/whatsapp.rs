//! WhatsApp delivery through the Whapi gateway.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, error};

/// Longest gateway error body kept in [`DeliveryError::Status`], in characters.
const MAX_ERROR_BODY: usize = 512;

/// Error type for delivery.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Errors raised while delivering a message.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered with a non-success status
    #[error("Gateway returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Recipient number is empty
    #[error("Invalid recipient '{0}'")]
    InvalidRecipient(String),

    /// No API key configured
    #[error("No API key configured for the WhatsApp gateway")]
    MissingApiKey,
}

/// Gateway acknowledgement of a sent message.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    /// Gateway message id, when reported
    pub id: Option<String>,
    /// Raw response
    pub response: JsonValue,
}

/// Something that can deliver text messages to a phone number.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a text message.
    async fn send_text(&self, to: &str, body: &str) -> Result<SentMessage>;

    /// Mark an inbound message as read.
    async fn mark_read(&self, message_id: &str) -> Result<()>;
}

/// Configuration for [`WhapiClient`].
#[derive(Debug, Clone)]
pub struct WhapiConfig {
    /// Bearer token
    pub api_key: String,
    /// Gateway base URL
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Simulated typing time in seconds
    pub typing_time: u32,
}

impl Default for WhapiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://gate.whapi.cloud".to_string(),
            timeout: Duration::from_secs(30),
            typing_time: 0,
        }
    }
}

#[derive(Serialize)]
struct TextMessage<'a> {
    typing_time: u32,
    to: &'a str,
    body: &'a str,
}

/// Whapi REST client.
#[derive(Clone)]
pub struct WhapiClient {
    client: Client,
    config: WhapiConfig,
}

impl WhapiClient {
    /// Create a client.
    pub fn new(config: WhapiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(DeliveryError::MissingApiKey);
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post(&self, path: &str, body: Option<&TextMessage<'_>>) -> Result<JsonValue> {
        let mut request = self.client.post(self.url(path)).bearer_auth(&self.config.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(path, status = status.as_u16(), "WhatsApp gateway request failed");
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        // Some endpoints answer with an empty body.
        let text = response.text().await?;
        Ok(serde_json::from_str(&text).unwrap_or(JsonValue::Null))
    }
}

#[async_trait]
impl MessageSender for WhapiClient {
    async fn send_text(&self, to: &str, body: &str) -> Result<SentMessage> {
        let to = to.trim();
        if to.is_empty() {
            return Err(DeliveryError::InvalidRecipient(to.to_string()));
        }

        let message = TextMessage {
            typing_time: self.config.typing_time,
            to,
            body,
        };
        let response = self.post("messages/text", Some(&message)).await?;
        let id = response
            .pointer("/message/id")
            .or_else(|| response.get("id"))
            .and_then(JsonValue::as_str)
            .map(str::to_string);

        debug!(to, id = ?id, "WhatsApp message sent");
        Ok(SentMessage { id, response })
    }

    async fn mark_read(&self, message_id: &str) -> Result<()> {
        self.post(&format!("messages/{message_id}/read"), None).await?;
        Ok(())
    }
}
