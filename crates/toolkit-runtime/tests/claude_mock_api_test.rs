#![cfg(feature = "claude")]

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use toolkit_core::{
    Client, RequestBuilder, RequestOptions, ResultItem, Role, StopReason, Tool, ToolError,
    ToolkitError,
};
use toolkit_runtime::{ClaudeConfig, ClaudeProvider};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

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
        json!({"type": "object", "properties": {"text": {"type": "string"}}})
    }

    async fn perform(&self, input: &Value) -> Result<String, ToolError> {
        Ok(input["text"].as_str().unwrap_or_default().to_string())
    }
}

fn provider(server: &MockServer) -> ClaudeProvider {
    ClaudeProvider::from_config(ClaudeConfig::new("test-key").with_base_url(server.uri()))
        .expect("provider")
}

fn text_reply(text: &str) -> Value {
    json!({
        "id": "msg_02",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-opus-20240229",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 30, "output_tokens": 5}
    })
}

#[tokio::test]
async fn claude_sends_headers_and_parses_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "model": "claude-3-opus-20240229",
            "max_tokens": 256,
            "system": "Be brief",
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("Hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::new(Arc::new(provider(&server)));
    let mut builder = RequestBuilder::new();
    builder
        .set_system_prompt("Be brief")
        .add_message(Role::User, "Hello");

    let responses = client
        .request(builder, &RequestOptions::new().max_tokens(256))
        .await
        .expect("response");

    assert_eq!(responses.len(), 1);
    assert_eq!(responses.stop_reason(), Some(&StopReason::EndTurn));
    assert_eq!(responses.messages()[0].text(), Some("Hi there"));
    assert_eq!(responses.total_input_tokens(), 30);
    assert_eq!(responses.total_output_tokens(), 5);
    assert!(responses[0].execution_time().is_some());
}

#[tokio::test]
async fn claude_tool_loop_round_trip() {
    let server = MockServer::start().await;

    // Follow-up call carrying the tool result
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_string_contains("tool_result"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_reply("It said hello")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Let me echo that."},
                {"type": "tool_use", "id": "toolu_01", "name": "echo", "input": {"text": "hello"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 20, "output_tokens": 10}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::new(Arc::new(provider(&server)));
    let mut builder = RequestBuilder::new();
    builder.add_message(Role::User, "Echo hello");
    builder.register_local(EchoTool).expect("register");

    let responses = client
        .request(builder, &RequestOptions::default())
        .await
        .expect("responses");

    assert_eq!(responses.len(), 2);
    assert_eq!(responses.stop_reason(), Some(&StopReason::EndTurn));
    assert_eq!(
        responses.all_results(),
        &[
            ResultItem::message("assistant", "Let me echo that."),
            ResultItem::tool_request("toolu_01", "echo", json!({"text": "hello"})),
            ResultItem::tool_response("toolu_01", "hello"),
            ResultItem::message("assistant", "It said hello"),
        ]
    );
    assert_eq!(responses.total_input_tokens(), 50);
    assert_eq!(responses.total_output_tokens(), 15);
}

#[tokio::test]
async fn claude_rate_limit_maps_to_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "type": "error",
            "error": {"type": "rate_limit_error", "message": "Too many requests"}
        })))
        .mount(&server)
        .await;

    let client = Client::new(Arc::new(provider(&server)));
    let mut builder = RequestBuilder::new();
    builder.add_message(Role::User, "Hello");

    let err = client
        .request(builder, &RequestOptions::default())
        .await
        .expect_err("rate limited");

    assert!(matches!(err, ToolkitError::RateLimited(ref m) if m == "Too many requests"));
}

#[tokio::test]
async fn claude_auth_failure_maps_to_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "type": "error",
            "error": {"type": "authentication_error", "message": "invalid x-api-key"}
        })))
        .mount(&server)
        .await;

    let client = Client::new(Arc::new(provider(&server)));
    let err = client
        .request(RequestBuilder::new(), &RequestOptions::default())
        .await
        .expect_err("unauthorized");

    assert!(matches!(err, ToolkitError::Auth(_)));
    assert!(!err.user_message().contains("x-api-key"));
}
