//! Chat-completion client for the hosted language model.
//!
//! [`ChatModel`] is the seam every prompt-driven component talks to;
//! [`OpenAiClient`] implements it against any OpenAI-compatible
//! `/v1/chat/completions` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Longest provider error body kept in [`LlmError::Status`], in characters.
const MAX_ERROR_BODY: usize = 512;

/// Error type for model calls.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors raised while talking to the model provider.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Transport failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("Provider returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Response did not have the expected shape
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// Model output was expected to be JSON and was not
    #[error("Model output is not valid JSON: {0}")]
    InvalidJson(String),

    /// No API key configured
    #[error("No API key configured for the model provider")]
    MissingApiKey,
}

impl LlmError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Http(e) => e.is_timeout() || e.is_connect(),
            LlmError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model
    System,
    /// End-user content
    User,
    /// Earlier model output
    Assistant,
}

/// One message of a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who is speaking
    pub role: Role,
    /// Message text
    pub content: String,
}

/// A chat completion request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    /// Conversation so far
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature, provider default when `None`
    pub temperature: Option<f32>,

    /// Ask the provider to force a JSON object response
    pub json_response: bool,
}

impl ChatRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a system message.
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: Role::System,
            content: content.into(),
        });
        self
    }

    /// Append a user message.
    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: Role::User,
            content: content.into(),
        });
        self
    }

    /// Set the temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Request a JSON object response.
    pub fn json(mut self) -> Self {
        self.json_response = true;
        self
    }
}

/// A language model that completes chat requests.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Return the text of the first completion choice.
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

#[async_trait]
impl<T: ChatModel + ?Sized> ChatModel for std::sync::Arc<T> {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        (**self).complete(request).await
    }
}

/// Configuration for [`OpenAiClient`].
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Bearer token
    pub api_key: String,

    /// Base URL without the `/v1/...` suffix
    pub base_url: String,

    /// Model name
    pub model: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Delay before each attempt; its length is the attempt count
    pub backoff: Vec<Duration>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            timeout: Duration::from_secs(60),
            backoff: vec![
                Duration::from_secs(0),
                Duration::from_secs(1),
                Duration::from_secs(2),
            ],
        }
    }
}

/// Client for OpenAI-compatible chat completion APIs.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a client.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()?;
        let endpoint = format!("{}/v1/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    /// Model this client talks to.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_body(&self, request: &ChatRequest) -> JsonValue {
        let mut body = json!({
            "model": self.config.model,
            "messages": request.messages,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if request.json_response {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }

    async fn attempt(&self, body: &JsonValue) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let body: JsonValue = response.json().await?;
        body.pointer("/choices/0/message/content")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".to_string()))
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let body = self.build_body(&request);
        let attempts = self.config.backoff.len().max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if let Some(delay) = self.config.backoff.get(attempt) {
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
            }

            let started = Instant::now();
            debug!(model = %self.config.model, attempt = attempt + 1, "Invoking chat completion");

            match self.attempt(&body).await {
                Ok(content) => {
                    debug!(
                        latency_ms = started.elapsed().as_millis() as u64,
                        "Chat completion succeeded"
                    );
                    return Ok(content);
                }
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    warn!(attempt = attempt + 1, error = %e, "Chat completion failed, retrying");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("no attempt was made".to_string())))
    }
}
