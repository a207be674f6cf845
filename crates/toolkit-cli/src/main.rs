//! toolkit command-line demo
//!
//! Sends one prompt with an `echo` tool registered and prints every response of
//! the run as JSON. `TOOLKIT_PROVIDER` picks the backend (`claude` by default,
//! or `bedrock`).
//!
//! ```text
//! CLAUDE_API_KEY=... toolkit-cli "Please echo 'hello world'"
//! TOOLKIT_PROVIDER=bedrock AWS_BEARER_TOKEN_BEDROCK=... BEDROCK_MODEL_ID=... toolkit-cli
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use toolkit_core::{Client, Provider, RequestBuilder, RequestOptions, Role, Tool, ToolError};
use toolkit_runtime::{BedrockProvider, ClaudeProvider};

const DEFAULT_PROMPT: &str = "Use the echo tool to repeat 'hello from the toolkit'.";

/// Repeats its `text` input back to the model
struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes the provided text back"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "Text to echo"}
            },
            "required": ["text"]
        })
    }

    async fn perform(&self, input: &Value) -> Result<String, ToolError> {
        input["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ToolError::safe("missing required field: text"))
    }
}

fn prompt_from_args(args: impl Iterator<Item = String>) -> String {
    let prompt = args.collect::<Vec<_>>().join(" ");
    if prompt.trim().is_empty() {
        DEFAULT_PROMPT.to_string()
    } else {
        prompt
    }
}

fn provider_from_env(choice: Option<&str>) -> anyhow::Result<Arc<dyn Provider>> {
    match choice.unwrap_or("claude") {
        "claude" => Ok(Arc::new(ClaudeProvider::from_env()?)),
        "bedrock" => Ok(Arc::new(BedrockProvider::from_env()?)),
        other => anyhow::bail!("unknown TOOLKIT_PROVIDER '{other}' (expected claude or bedrock)"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let provider = provider_from_env(std::env::var("TOOLKIT_PROVIDER").ok().as_deref())?;
    tracing::info!(
        provider = %provider.name(),
        model = provider.model_identifier().unwrap_or("unknown"),
        "Provider ready"
    );

    let client = Client::new(provider)
        .before_request(|request, context| {
            tracing::info!(
                provider = %context.provider,
                messages = request.messages.len(),
                tools = request.tools.len(),
                "Sending request"
            );
            Ok(())
        })
        .after_request(|_, payload, context| {
            tracing::info!(
                provider = %context.provider,
                stop_reason = %payload.stop_reason,
                tool_uses = payload.tool_uses.len(),
                "Received response"
            );
            Ok(())
        });

    let mut builder = RequestBuilder::new();
    builder
        .set_system_prompt("You are a helpful assistant. Use tools when asked.")
        .add_message(Role::User, prompt_from_args(std::env::args().skip(1)));
    builder.register_local(EchoTool)?;

    let responses = client.request(builder, &RequestOptions::default()).await?;

    println!("{}", serde_json::to_string_pretty(&responses)?);
    tracing::info!(
        calls = responses.len(),
        input_tokens = responses.total_input_tokens(),
        output_tokens = responses.total_output_tokens(),
        elapsed_ms = responses.total_execution_time().as_millis(),
        "Done"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_tool() {
        let output = EchoTool.perform(&json!({"text": "hi"})).await.unwrap();
        assert_eq!(output, "hi");

        let outcome = EchoTool.call(&json!({})).await;
        assert!(!outcome.is_terminate());
        assert_eq!(outcome.output(), "missing required field: text");
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        let err = provider_from_env(Some("ollama")).err().unwrap();
        assert!(err.to_string().contains("unknown TOOLKIT_PROVIDER"));
    }

    #[test]
    fn test_prompt_from_args() {
        let args = ["echo", "this"].map(String::from).into_iter();
        assert_eq!(prompt_from_args(args), "echo this");
        assert_eq!(prompt_from_args(std::iter::empty()), DEFAULT_PROMPT);
    }
}
