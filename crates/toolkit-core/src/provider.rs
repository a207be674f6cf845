//! Provider Capability
//!
//! Defines the interface every LLM backend implements. The client only ever sees
//! a [`ProviderRequest`] going out and a normalized [`ProviderPayload`] coming
//! back; wire formats stay inside the implementations.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toolkit_core::provider::Provider;
//!
//! let provider = ClaudeProvider::from_env()?;
//! let payload = provider.call(&request).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::Result;
use crate::message::ChatMessage;

/// Parameters for a single provider call
///
/// Optional generation settings are omitted from the serialized form when unset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Ordered conversation entries
    pub messages: Vec<ChatMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Tool declarations, in registration order
    #[serde(default)]
    pub tools: Vec<Value>,

    pub max_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

/// Why a single provider call ended
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    PauseTurn,
    MaxTokens,
    StopSequence,
    /// A local tool ended the loop
    ToolStop,
    /// Any other provider-defined reason
    Other(String),
}

impl StopReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::EndTurn => "end_turn",
            Self::ToolUse => "tool_use",
            Self::PauseTurn => "pause_turn",
            Self::MaxTokens => "max_tokens",
            Self::StopSequence => "stop_sequence",
            Self::ToolStop => "tool_stop",
            Self::Other(reason) => reason,
        }
    }

    /// Whether the loop should keep calling the provider
    pub fn continues_loop(&self) -> bool {
        matches!(self, Self::ToolUse | Self::PauseTurn)
    }
}

impl From<&str> for StopReason {
    fn from(reason: &str) -> Self {
        match reason {
            "end_turn" => Self::EndTurn,
            "tool_use" => Self::ToolUse,
            "pause_turn" => Self::PauseTurn,
            "max_tokens" => Self::MaxTokens,
            "stop_sequence" => Self::StopSequence,
            "tool_stop" => Self::ToolStop,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for StopReason {
    fn from(reason: String) -> Self {
        Self::from(reason.as_str())
    }
}

impl From<StopReason> for String {
    fn from(reason: StopReason) -> Self {
        reason.as_str().to_string()
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool the model asked to run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// Token usage statistics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Canonical result of one provider call
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProviderPayload {
    pub stop_reason: StopReason,

    /// Plain emitted messages, including opaque content blocks
    pub messages: Vec<ChatMessage>,

    /// Tool-use requests, in emitted order
    pub tool_uses: Vec<ToolUse>,

    /// Fragments the normalizer could not place
    pub unknown: Vec<Value>,

    pub usage: Option<TokenUsage>,

    pub execution_time: Option<Duration>,
}

impl ProviderPayload {
    pub fn new(stop_reason: StopReason) -> Self {
        Self {
            stop_reason,
            messages: Vec::new(),
            tool_uses: Vec::new(),
            unknown: Vec::new(),
            usage: None,
            execution_time: None,
        }
    }

    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_tool_use(mut self, tool_use: ToolUse) -> Self {
        self.tool_uses.push(tool_use);
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_execution_time(mut self, execution_time: Duration) -> Self {
        self.execution_time = Some(execution_time);
        self
    }
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The client works exclusively through this interface.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g. "claude"), passed to hooks
    fn name(&self) -> &str;

    /// Model the provider is configured for, if it has one
    fn model_identifier(&self) -> Option<&str>;

    /// Perform one call and fold the native response into the canonical shape
    async fn call(&self, request: &ProviderRequest) -> Result<ProviderPayload>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stop_reason_round_trips_unknown_values() {
        let reason: StopReason = serde_json::from_value(json!("refusal")).unwrap();
        assert_eq!(reason, StopReason::Other("refusal".into()));
        assert_eq!(serde_json::to_value(&reason).unwrap(), json!("refusal"));
        assert_eq!(StopReason::from("pause_turn"), StopReason::PauseTurn);
    }

    #[test]
    fn test_continues_loop() {
        assert!(StopReason::ToolUse.continues_loop());
        assert!(StopReason::PauseTurn.continues_loop());
        assert!(!StopReason::EndTurn.continues_loop());
        assert!(!StopReason::ToolStop.continues_loop());
        assert!(!StopReason::Other("refusal".into()).continues_loop());
    }

    #[test]
    fn test_request_omits_unset_options() {
        let request = ProviderRequest {
            messages: vec![ChatMessage::user("hi")],
            system_prompt: None,
            tools: Vec::new(),
            max_tokens: 1024,
            tool_choice: None,
            temperature: Some(0.5),
            top_k: None,
            top_p: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("system_prompt"));
        assert!(!object.contains_key("tool_choice"));
        assert!(!object.contains_key("top_k"));
        assert_eq!(value["temperature"], json!(0.5));
    }
}
