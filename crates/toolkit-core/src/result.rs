//! Result Items
//!
//! Canonical record of everything that happened during a request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry in a response's result stream
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResultItem {
    /// A conversational turn emitted by the model
    Message { role: String, content: Value },

    /// The model asked for a tool to be invoked
    ToolRequest { id: String, name: String, input: Value },

    /// Output sent back to the model for an earlier request
    ToolResponse { tool_use_id: String, content: String },

    /// A payload shape the normalizer did not recognize, kept verbatim
    Unknown { json: Value },
}

impl ResultItem {
    pub fn message(role: impl Into<String>, content: impl Into<Value>) -> Self {
        Self::Message {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn tool_request(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self::ToolRequest {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn tool_response(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResponse {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
        }
    }

    pub fn is_message(&self) -> bool {
        matches!(self, Self::Message { .. })
    }

    pub fn is_tool_request(&self) -> bool {
        matches!(self, Self::ToolRequest { .. })
    }

    pub fn is_tool_response(&self) -> bool {
        matches!(self, Self::ToolResponse { .. })
    }

    /// Message or tool-response content
    pub fn content(&self) -> Option<Value> {
        match self {
            Self::Message { content, .. } => Some(content.clone()),
            Self::ToolResponse { content, .. } => Some(Value::String(content.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_with_type_tag() {
        let item = ResultItem::tool_response("tu_1", "done");
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            json!({"type": "tool_response", "tool_use_id": "tu_1", "content": "done"})
        );
    }

    #[test]
    fn test_content_accessor() {
        assert_eq!(
            ResultItem::message("assistant", "hi").content(),
            Some(json!("hi"))
        );
        assert_eq!(
            ResultItem::tool_request("1", "echo", json!({})).content(),
            None
        );
    }
}
