//! Conversation Messages
//!
//! Role/content entries sent to providers. Content is opaque JSON so that plain
//! text and provider content blocks travel through the same type.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Common message roles
///
/// Roles on [`ChatMessage`] are free-form strings because providers disagree
/// on the set; this enum only names the ones the toolkit itself emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role
    pub role: String,

    /// Text or structured content, passed through unchanged
    pub content: Value,
}

impl ChatMessage {
    /// Create a new message
    pub fn new(role: impl Into<String>, content: impl Into<Value>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<Value>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<Value>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant entry recording a tool-use request
    pub fn tool_use(id: &str, name: &str, input: &Value) -> Self {
        Self::assistant(json!([{
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": input,
        }]))
    }

    /// User entry carrying a tool's output back to the model
    pub fn tool_result(tool_use_id: &str, content: &str) -> Self {
        Self::user(json!([{
            "type": "tool_result",
            "tool_use_id": tool_use_id,
            "content": content,
        }]))
    }

    /// Text content, if this message holds a plain string
    pub fn text(&self) -> Option<&str> {
        self.content.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = ChatMessage::user("Hello");
        assert_eq!(msg.role, "user");
        assert_eq!(msg.text(), Some("Hello"));
    }

    #[test]
    fn test_roles_are_free_form() {
        let msg = ChatMessage::new("developer", "be brief");
        assert_eq!(msg.role, "developer");
    }

    #[test]
    fn test_tool_entries() {
        let request = ChatMessage::tool_use("tu_1", "echo", &json!({"text": "hi"}));
        assert_eq!(request.role, "assistant");
        assert_eq!(request.content[0]["type"], "tool_use");
        assert_eq!(request.content[0]["input"]["text"], "hi");

        let result = ChatMessage::tool_result("tu_1", "hi");
        assert_eq!(result.role, "user");
        assert_eq!(result.content[0]["tool_use_id"], "tu_1");
        assert_eq!(result.content[0]["content"], "hi");
        assert_eq!(result.text(), None);
    }
}
