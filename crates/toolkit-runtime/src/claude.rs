//! Claude Provider
//!
//! Implementation of `Provider` for the Anthropic Messages API.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use toolkit_core::{
    error::{Result, ToolkitError},
    message::ChatMessage,
    normalize::normalize_payload,
    provider::{Provider, ProviderPayload, ProviderRequest},
};

use crate::http;

/// Messages API version sent with every request
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude provider configuration
#[derive(Clone, Debug)]
pub struct ClaudeConfig {
    /// API key
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// API base URL, without the `/v1/messages` path
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ClaudeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "claude-3-opus-20240229".into(),
            base_url: "https://api.anthropic.com".into(),
            timeout_secs: 120,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Read configuration from `CLAUDE_*` environment variables
    ///
    /// `CLAUDE_API_KEY` is required; `CLAUDE_MODEL`, `CLAUDE_BASE_URL` and
    /// `CLAUDE_TIMEOUT_SECS` fall back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("CLAUDE_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ToolkitError::Config("CLAUDE_API_KEY is not set".into()))?;

        let mut config = Self::new(api_key);
        if let Some(model) = lookup("CLAUDE_MODEL") {
            config.model = model;
        }
        if let Some(base_url) = lookup("CLAUDE_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(timeout) = lookup("CLAUDE_TIMEOUT_SECS").and_then(|t| t.parse().ok()) {
            config.timeout_secs = timeout;
        }

        Ok(config)
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

/// Request body for `POST /v1/messages`
#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: &'a [ChatMessage],
    tools: &'a [Value],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

/// Claude provider
pub struct ClaudeProvider {
    client: reqwest::Client,
    config: ClaudeConfig,
}

impl ClaudeProvider {
    /// Create from configuration
    pub fn from_config(config: ClaudeConfig) -> Result<Self> {
        let client = http::build_client(config.timeout_secs)?;
        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClaudeConfig::from_env()?)
    }

    pub fn config(&self) -> &ClaudeConfig {
        &self.config
    }

    fn build_body<'a>(&'a self, request: &'a ProviderRequest) -> MessagesBody<'a> {
        MessagesBody {
            model: &self.config.model,
            max_tokens: request.max_tokens,
            messages: &request.messages,
            tools: &request.tools,
            system: request.system_prompt.as_deref(),
            tool_choice: request.tool_choice.as_ref(),
            temperature: request.temperature,
            top_k: request.top_k,
            top_p: request.top_p,
        }
    }
}

#[async_trait]
impl Provider for ClaudeProvider {
    fn name(&self) -> &str {
        "claude"
    }

    fn model_identifier(&self) -> Option<&str> {
        Some(&self.config.model)
    }

    async fn call(&self, request: &ProviderRequest) -> Result<ProviderPayload> {
        let post = self
            .client
            .post(self.config.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);

        let (raw, elapsed) = http::send_json(post, &self.build_body(request), self.name()).await?;
        let mut payload = normalize_payload(&raw)?;
        payload.execution_time = payload.execution_time.or(Some(elapsed));

        tracing::debug!(
            model = %self.config.model,
            stop_reason = %payload.stop_reason,
            elapsed_ms = elapsed.as_millis(),
            "Claude request finished"
        );
        Ok(payload)
    }
}
