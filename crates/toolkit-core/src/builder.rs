//! Request Builder
//!
//! Collects the system prompt, messages and tools for one request.

use serde_json::Value;
use std::collections::HashSet;

use crate::error::{Result, ToolkitError};
use crate::message::ChatMessage;
use crate::tool::{Tool, ToolDeclaration, ToolRegistry};

/// Conversation state handed to the client for one run
pub(crate) struct Conversation {
    pub system_prompt: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<Value>,
}

/// Builder for a client request
#[derive(Clone, Default)]
pub struct RequestBuilder {
    system_prompt: Option<String>,
    messages: Vec<ChatMessage>,
    declarations: Vec<ToolDeclaration>,
    names: HashSet<String>,
    registry: ToolRegistry,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the system prompt, replacing any earlier one
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) -> &mut Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Append a chat message
    pub fn add_message(
        &mut self,
        role: impl Into<String>,
        content: impl Into<Value>,
    ) -> &mut Self {
        self.messages.push(ChatMessage::new(role, content));
        self
    }

    /// Register a tool
    ///
    /// Server-side declarations are sent as-is. Local tools are also made
    /// available for execution. Names must be unique across both kinds and
    /// input schemas are checked here, not at call time.
    pub fn register_tool(&mut self, declaration: impl Into<ToolDeclaration>) -> Result<&mut Self> {
        let declaration = declaration.into();
        let name = declaration.name().to_string();

        if self.names.contains(&name) {
            return Err(ToolkitError::DuplicateTool(name));
        }
        declaration.validate()?;

        if let ToolDeclaration::Local(tool) = &declaration {
            self.registry.register(tool.clone())?;
        }

        tracing::debug!(tool = %name, "Registered tool");
        self.names.insert(name);
        self.declarations.push(declaration);
        Ok(self)
    }

    /// Register a locally executed tool
    pub fn register_local<T: Tool + 'static>(&mut self, tool: T) -> Result<&mut Self> {
        self.register_tool(ToolDeclaration::local(tool))
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Tool declarations as they will be sent to the provider
    pub fn tool_specs(&self) -> Vec<Value> {
        self.declarations.iter().map(ToolDeclaration::spec).collect()
    }

    /// Locally executable tools
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub(crate) fn into_parts(self) -> (Conversation, ToolRegistry) {
        let tools = self.tool_specs();
        (
            Conversation {
                system_prompt: self.system_prompt,
                messages: self.messages,
                tools,
            },
            self.registry,
        )
    }
}
