//! Payload Normalization
//!
//! Providers answer in more than one shape. Two are understood here:
//!
//! - message arrays: `{"stop_reason", "messages": [...], "tool_uses": [...]}`,
//!   where tool uses may instead be embedded in messages as `{"tool_use": {...}}`
//! - content blocks: `{"stop_reason", "role", "content": [{"type": "text"}, ...]}`
//!
//! Content blocks of any other type stay in the message list as opaque content.
//! Anything that fits neither shape is kept in [`ProviderPayload::unknown`].

use serde_json::{Map, Value, json};
use std::time::Duration;

use crate::error::{Result, ToolkitError};
use crate::message::{ChatMessage, Role};
use crate::provider::{ProviderPayload, StopReason, TokenUsage, ToolUse};

/// Top-level keys that carry no content of their own
const ENVELOPE_KEYS: &[&str] = &[
    "stop_reason",
    "tool_uses",
    "usage",
    "execution_time",
    "id",
    "type",
    "model",
    "role",
    "stop_sequence",
];

/// Fold a provider-native JSON payload into a [`ProviderPayload`]
pub fn normalize_payload(raw: &Value) -> Result<ProviderPayload> {
    let object = raw
        .as_object()
        .ok_or_else(|| ToolkitError::Parse("provider payload must be a JSON object".into()))?;

    let stop_reason = object
        .get("stop_reason")
        .and_then(Value::as_str)
        .map(StopReason::from)
        .ok_or_else(|| ToolkitError::Parse(format!("payload has no stop_reason: {raw}")))?;

    let mut payload = ProviderPayload::new(stop_reason);

    match (object.get("messages"), object.get("content")) {
        (Some(Value::Array(messages)), _) => {
            read_messages(&mut payload, messages, object.get("tool_uses"))?;
        }
        (None, Some(Value::Array(blocks))) => {
            let role = object
                .get("role")
                .and_then(Value::as_str)
                .unwrap_or(Role::Assistant.as_str());
            read_content_blocks(&mut payload, role, blocks)?;
        }
        (None, None) => {
            if let Some(tool_uses) = object.get("tool_uses") {
                read_tool_uses(&mut payload, tool_uses)?;
            }
            if object.keys().any(|key| !ENVELOPE_KEYS.contains(&key.as_str())) {
                payload.unknown.push(raw.clone());
            }
        }
        _ => payload.unknown.push(raw.clone()),
    }

    payload.usage = object.get("usage").and_then(read_usage);
    payload.execution_time = object
        .get("execution_time")
        .and_then(Value::as_f64)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

    Ok(payload)
}

fn read_messages(
    payload: &mut ProviderPayload,
    messages: &[Value],
    tool_uses: Option<&Value>,
) -> Result<()> {
    for entry in messages {
        let Some(object) = entry.as_object() else {
            payload.unknown.push(entry.clone());
            continue;
        };

        match object.get("role").and_then(Value::as_str) {
            Some(role) => payload.messages.push(ChatMessage::new(
                role,
                object.get("content").cloned().unwrap_or(Value::Null),
            )),
            None if object.contains_key("tool_use") => {}
            None => payload.unknown.push(entry.clone()),
        }

        if tool_uses.is_none() {
            if let Some(Value::Object(tool_use)) = object.get("tool_use") {
                payload.tool_uses.push(read_tool_use(tool_use)?);
            }
        }
    }

    if let Some(tool_uses) = tool_uses {
        read_tool_uses(payload, tool_uses)?;
    }

    Ok(())
}

fn read_content_blocks(payload: &mut ProviderPayload, role: &str, blocks: &[Value]) -> Result<()> {
    for block in blocks {
        let Some(object) = block.as_object() else {
            payload.unknown.push(block.clone());
            continue;
        };

        match object.get("type").and_then(Value::as_str) {
            Some("text") => payload.messages.push(ChatMessage::new(
                role,
                object.get("text").cloned().unwrap_or(Value::Null),
            )),
            Some("tool_use") => payload.tool_uses.push(read_tool_use(object)?),
            _ => payload.messages.push(ChatMessage::new(role, block.clone())),
        }
    }

    Ok(())
}

fn read_tool_uses(payload: &mut ProviderPayload, tool_uses: &Value) -> Result<()> {
    let Value::Array(entries) = tool_uses else {
        payload.unknown.push(tool_uses.clone());
        return Ok(());
    };

    for entry in entries {
        match entry {
            Value::Object(object) => payload.tool_uses.push(read_tool_use(object)?),
            other => payload.unknown.push(other.clone()),
        }
    }

    Ok(())
}

fn read_tool_use(object: &Map<String, Value>) -> Result<ToolUse> {
    let name = object
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolkitError::Parse(format!("tool use without a name: {object:?}")))?;

    // Some providers omit ids; the loop still needs one to pair results.
    let id = object
        .get("id")
        .and_then(Value::as_str)
        .map_or_else(|| format!("toolu_{}", uuid::Uuid::new_v4().simple()), str::to_string);

    Ok(ToolUse {
        id,
        name: name.to_string(),
        input: object.get("input").cloned().unwrap_or_else(|| json!({})),
    })
}

fn read_usage(usage: &Value) -> Option<TokenUsage> {
    let usage = usage.as_object()?;
    Some(TokenUsage {
        input_tokens: usage.get("input_tokens").and_then(Value::as_u64),
        output_tokens: usage.get("output_tokens").and_then(Value::as_u64),
    })
}
