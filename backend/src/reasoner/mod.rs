//! Generic reasoner: the external text/vision completion capability.
//!
//! The gateway treats the backend as "prompt in, text out". One call per
//! invocation, no retries, no streaming.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway::reasoner::{self, Reasoner};
//! use gateway::GatewayConfig;
//!
//! let reasoner = reasoner::from_config(&GatewayConfig::from_env()?.reasoner);
//! let reply = reasoner.complete_text("Summarize: ...").await?;
//! ```

pub mod prompt;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ReasonerConfig;
use crate::error::{ReasonerError, ReasonerResult};

/// Text and vision completion.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Short backend label for health output and artifacts.
    fn name(&self) -> &str;

    /// Whether calls can succeed at all (false when running degraded).
    fn is_available(&self) -> bool {
        true
    }

    async fn complete_text(&self, prompt: &str) -> ReasonerResult<String>;

    async fn complete_vision(
        &self,
        image: &[u8],
        media_type: &str,
        prompt: &str,
    ) -> ReasonerResult<String>;
}

/// Build the reasoner for this process: Anthropic when a key is configured,
/// otherwise the degraded [`UnavailableReasoner`].
pub fn from_config(config: &ReasonerConfig) -> Arc<dyn Reasoner> {
    match AnthropicReasoner::from_config(config) {
        Some(client) => {
            tracing::info!(model = %client.model, "reasoner configured");
            Arc::new(client)
        }
        None => {
            tracing::warn!("ANTHROPIC_API_KEY not set, text and vision analysis disabled");
            Arc::new(UnavailableReasoner::new("ANTHROPIC_API_KEY not set"))
        }
    }
}

// =============================================================================
// Degraded mode
// =============================================================================

/// Reasoner used when no credentials are configured. Fails fast.
#[derive(Debug, Clone)]
pub struct UnavailableReasoner {
    reason: String,
}

impl UnavailableReasoner {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Reasoner for UnavailableReasoner {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn complete_text(&self, _prompt: &str) -> ReasonerResult<String> {
        Err(ReasonerError::Unavailable(self.reason.clone()))
    }

    async fn complete_vision(
        &self,
        _image: &[u8],
        _media_type: &str,
        _prompt: &str,
    ) -> ReasonerResult<String> {
        Err(ReasonerError::Unavailable(self.reason.clone()))
    }
}

// =============================================================================
// Anthropic Messages API
// =============================================================================

/// Anthropic API client
#[derive(Clone)]
pub struct AnthropicReasoner {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

/// Anthropic API response structure
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

/// Anthropic API error response
#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl AnthropicReasoner {
    /// Create a client with an explicit API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        let defaults = ReasonerConfig::default();
        Self {
            http: build_http(defaults.timeout_secs),
            api_key: api_key.into(),
            model: defaults.model,
            base_url: defaults.base_url,
            max_tokens: defaults.max_tokens,
        }
    }

    /// `None` when no API key is configured
    pub fn from_config(config: &ReasonerConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        Some(Self {
            http: build_http(config.timeout_secs),
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Set the model to use
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Point at another endpoint (proxies, tests)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Send one user message and return the concatenated text blocks.
    async fn call_api(&self, content: Value) -> ReasonerResult<String> {
        let request_body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": prompt::system_prompt(),
            "messages": [{ "role": "user", "content": content }]
        });

        tracing::debug!(model = %self.model, "calling reasoner");

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ReasonerError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ReasonerError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<AnthropicError>(&body) {
                return Err(ReasonerError::ApiError(error.error.message));
            }
            return Err(ReasonerError::ApiError(format!("HTTP {}: {}", status, body)));
        }

        let response: AnthropicResponse = serde_json::from_str(&body)
            .map_err(|e| ReasonerError::InvalidResponse(e.to_string()))?;

        let text = response
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(ReasonerError::InvalidResponse("empty response".to_string()));
        }

        tracing::debug!(chars = text.len(), "reasoner replied");
        Ok(text)
    }
}

fn build_http(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

#[async_trait]
impl Reasoner for AnthropicReasoner {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete_text(&self, prompt: &str) -> ReasonerResult<String> {
        self.call_api(json!([{ "type": "text", "text": prompt }]))
            .await
    }

    async fn complete_vision(
        &self,
        image: &[u8],
        media_type: &str,
        prompt: &str,
    ) -> ReasonerResult<String> {
        self.call_api(json!([
            {
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": media_type,
                    "data": STANDARD.encode(image),
                }
            },
            { "type": "text", "text": prompt }
        ]))
        .await
    }
}
