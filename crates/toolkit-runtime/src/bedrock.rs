//! Bedrock Provider
//!
//! Anthropic models hosted on AWS Bedrock, called through `InvokeModel` with a
//! Bedrock API key (`Authorization: Bearer ...`).

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

/// Anthropic version string Bedrock expects in the request body
pub const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Bedrock provider configuration
#[derive(Clone, Debug)]
pub struct BedrockConfig {
    /// Bedrock API key
    pub api_key: String,

    /// Model id, e.g. `anthropic.claude-3-sonnet-20240229-v1:0`
    pub model_id: String,

    /// Runtime endpoint, without the `/model/...` path
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl BedrockConfig {
    pub fn new(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model_id: model_id.into(),
            base_url: region_endpoint("us-east-1"),
            timeout_secs: 120,
        }
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.base_url = region_endpoint(region);
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

    /// Read configuration from the environment
    ///
    /// `AWS_BEARER_TOKEN_BEDROCK` and `BEDROCK_MODEL_ID` are required.
    /// `BEDROCK_BASE_URL` wins over the endpoint derived from `AWS_REGION`
    /// (default `us-east-1`).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ToolkitError::Config(format!("{key} is not set")))
        };

        let mut config = Self::new(
            required("AWS_BEARER_TOKEN_BEDROCK")?,
            required("BEDROCK_MODEL_ID")?,
        );
        if let Some(region) = lookup("AWS_REGION") {
            config = config.with_region(&region);
        }
        if let Some(base_url) = lookup("BEDROCK_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(timeout) = lookup("BEDROCK_TIMEOUT_SECS").and_then(|t| t.parse().ok()) {
            config.timeout_secs = timeout;
        }

        Ok(config)
    }

    fn invoke_url(&self) -> String {
        format!(
            "{}/model/{}/invoke",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.model_id)
        )
    }
}

fn region_endpoint(region: &str) -> String {
    format!("https://bedrock-runtime.{region}.amazonaws.com")
}

/// Request body for `InvokeModel` with an Anthropic model
#[derive(Debug, Serialize)]
struct InvokeBody<'a> {
    anthropic_version: &'static str,
    messages: &'a [ChatMessage],
    tools: &'a [Value],
    max_tokens: u32,
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

/// Bedrock provider
pub struct BedrockProvider {
    client: reqwest::Client,
    config: BedrockConfig,
}

impl BedrockProvider {
    pub fn from_config(config: BedrockConfig) -> Result<Self> {
        let client = http::build_client(config.timeout_secs)?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(BedrockConfig::from_env()?)
    }

    pub fn config(&self) -> &BedrockConfig {
        &self.config
    }

    fn build_body<'a>(request: &'a ProviderRequest) -> InvokeBody<'a> {
        InvokeBody {
            anthropic_version: BEDROCK_ANTHROPIC_VERSION,
            messages: &request.messages,
            tools: &request.tools,
            max_tokens: request.max_tokens,
            system: request.system_prompt.as_deref(),
            tool_choice: request.tool_choice.as_ref(),
            temperature: request.temperature,
            top_k: request.top_k,
            top_p: request.top_p,
        }
    }
}

#[async_trait]
impl Provider for BedrockProvider {
    fn name(&self) -> &str {
        "bedrock"
    }

    fn model_identifier(&self) -> Option<&str> {
        Some(&self.config.model_id)
    }

    async fn call(&self, request: &ProviderRequest) -> Result<ProviderPayload> {
        let post = self
            .client
            .post(self.config.invoke_url())
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::ACCEPT, "application/json");

        let (raw, elapsed) = http::send_json(post, &Self::build_body(request), self.name()).await?;
        let mut payload = normalize_payload(&raw)?;
        payload.execution_time = payload.execution_time.or(Some(elapsed));

        tracing::debug!(
            model_id = %self.config.model_id,
            stop_reason = %payload.stop_reason,
            elapsed_ms = elapsed.as_millis(),
            "Bedrock request finished"
        );
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_config_from_env_vars() {
        let config = BedrockConfig::from_lookup(lookup(&[
            ("AWS_BEARER_TOKEN_BEDROCK", "br-key"),
            ("BEDROCK_MODEL_ID", "anthropic.claude-3-sonnet-20240229-v1:0"),
            ("AWS_REGION", "eu-west-1"),
        ]))
        .unwrap();

        assert_eq!(config.api_key, "br-key");
        assert_eq!(config.base_url, "https://bedrock-runtime.eu-west-1.amazonaws.com");
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(
            config.invoke_url(),
            "https://bedrock-runtime.eu-west-1.amazonaws.com/model/anthropic.claude-3-sonnet-20240229-v1%3A0/invoke"
        );
    }

    #[test]
    fn test_base_url_override() {
        let config = BedrockConfig::from_lookup(lookup(&[
            ("AWS_BEARER_TOKEN_BEDROCK", "br-key"),
            ("BEDROCK_MODEL_ID", "m"),
            ("AWS_REGION", "eu-west-1"),
            ("BEDROCK_BASE_URL", "http://localhost:4566/"),
        ]))
        .unwrap();
        assert_eq!(config.invoke_url(), "http://localhost:4566/model/m/invoke");
    }

    #[test]
    fn test_missing_model_id() {
        let err = BedrockConfig::from_lookup(lookup(&[("AWS_BEARER_TOKEN_BEDROCK", "br-key")]))
            .unwrap_err();
        assert!(matches!(err, ToolkitError::Config(ref m) if m.contains("BEDROCK_MODEL_ID")));
    }

    #[test]
    fn test_body_shape() {
        let mut request = ProviderRequest {
            messages: vec![ChatMessage::user("hi")],
            system_prompt: None,
            tools: Vec::new(),
            max_tokens: 512,
            tool_choice: None,
            temperature: None,
            top_k: None,
            top_p: None,
        };
        assert_eq!(
            serde_json::to_value(BedrockProvider::build_body(&request)).unwrap(),
            json!({
                "anthropic_version": "bedrock-2023-05-31",
                "messages": [{"role": "user", "content": "hi"}],
                "tools": [],
                "max_tokens": 512
            })
        );

        request.system_prompt = Some("Be brief".into());
        request.temperature = Some(0.5);
        let body = serde_json::to_value(BedrockProvider::build_body(&request)).unwrap();
        assert_eq!(body["system"], "Be brief");
        assert_eq!(body["temperature"], 0.5);
        assert!(body.get("model").is_none());
    }
}
