//! Tool System
//!
//! Tools are either executed locally by the client or declared for the provider
//! to run server-side. Local tools translate their own failures so that nothing
//! but a string ever reaches the request loop.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::error::{Result, ToolkitError};

/// Output shown to the model when a tool fails with an internal error
pub const INTERNAL_ERROR_MESSAGE: &str =
    "There was an internal error with this call tool due to a code exception";

/// Failure raised from [`Tool::perform`]
#[derive(Error, Debug)]
pub enum ToolError {
    /// Message the model is allowed to see
    #[error("{0}")]
    Safe(String),

    /// Ends the request loop; the message becomes the tool's result
    #[error("{0}")]
    Stop(String),

    /// Anything else; replaced with [`INTERNAL_ERROR_MESSAGE`]
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn safe(message: impl Into<String>) -> Self {
        Self::Safe(message.into())
    }

    pub fn stop(message: impl Into<String>) -> Self {
        Self::Stop(message.into())
    }
}

/// What a tool invocation hands back to the request loop
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolOutcome {
    /// Keep going with this output
    Continue(String),
    /// Record this output, then end the loop
    Terminate(String),
}

impl ToolOutcome {
    pub fn output(&self) -> &str {
        match self {
            Self::Continue(out) | Self::Terminate(out) => out,
        }
    }

    pub fn into_output(self) -> String {
        match self {
            Self::Continue(out) | Self::Terminate(out) => out,
        }
    }

    pub fn is_terminate(&self) -> bool {
        matches!(self, Self::Terminate(_))
    }
}

/// Tool trait - implement to expose a local capability to the model
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool identifier
    fn name(&self) -> &str;

    /// Human-readable description (shown to the model)
    fn description(&self) -> &str;

    /// JSON schema for the tool input
    fn input_schema(&self) -> Value;

    /// Do the work
    async fn perform(&self, input: &Value) -> std::result::Result<String, ToolError>;

    /// Run [`Tool::perform`] and translate failures into model-visible output
    async fn call(&self, input: &Value) -> ToolOutcome {
        match self.perform(input).await {
            Ok(output) => ToolOutcome::Continue(output),
            Err(ToolError::Safe(message)) => ToolOutcome::Continue(message),
            Err(ToolError::Stop(message)) => ToolOutcome::Terminate(message),
            Err(ToolError::Internal(err)) => {
                tracing::warn!(tool = %self.name(), error = ?err, "Tool failed with internal error");
                ToolOutcome::Continue(INTERNAL_ERROR_MESSAGE.into())
            }
        }
    }

    /// Declaration sent to the provider
    fn declaration(&self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "input_schema": self.input_schema(),
        })
    }
}

/// Check that a tool input schema is a JSON object the schema compiler accepts
pub fn validate_schema(tool: &str, schema: &Value) -> Result<()> {
    if !schema.is_object() {
        return Err(ToolkitError::InvalidSchema {
            tool: tool.into(),
            reason: "schema must be a JSON object".into(),
        });
    }

    jsonschema::validator_for(schema).map_err(|e| ToolkitError::InvalidSchema {
        tool: tool.into(),
        reason: e.to_string(),
    })?;

    Ok(())
}

/// Declaration of a tool the provider executes itself (e.g. web search)
#[derive(Clone, Debug, PartialEq)]
pub struct ServerTool {
    pub name: String,
    pub input_schema: Option<Value>,
    /// Provider-specific options, passed through verbatim
    pub options: Map<String, Value>,
}

impl ServerTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_schema: None,
            options: Map::new(),
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    fn spec(&self) -> Value {
        let mut spec = Map::new();
        spec.insert("name".into(), Value::String(self.name.clone()));
        if let Some(schema) = &self.input_schema {
            spec.insert("input_schema".into(), schema.clone());
        }
        for (key, value) in &self.options {
            spec.insert(key.clone(), value.clone());
        }
        Value::Object(spec)
    }
}

/// A tool registration, decided once when the tool is added
#[derive(Clone)]
pub enum ToolDeclaration {
    /// Executed by the provider; only declared
    ServerSide(ServerTool),
    /// Executed by the client when the model asks for it
    Local(Arc<dyn Tool>),
}

impl ToolDeclaration {
    pub fn local<T: Tool + 'static>(tool: T) -> Self {
        Self::Local(Arc::new(tool))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::ServerSide(tool) => &tool.name,
            Self::Local(tool) => tool.name(),
        }
    }

    /// Validate the input schema, if any
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::ServerSide(tool) => match &tool.input_schema {
                Some(schema) => validate_schema(&tool.name, schema),
                None => Ok(()),
            },
            Self::Local(tool) => validate_schema(tool.name(), &tool.input_schema()),
        }
    }

    /// JSON declaration for the provider's tool list
    pub fn spec(&self) -> Value {
        match self {
            Self::ServerSide(tool) => tool.spec(),
            Self::Local(tool) => tool.declaration(),
        }
    }
}

impl From<ServerTool> for ToolDeclaration {
    fn from(tool: ServerTool) -> Self {
        Self::ServerSide(tool)
    }
}

impl std::fmt::Debug for ToolDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServerSide(tool) => f.debug_tuple("ServerSide").field(tool).finish(),
            Self::Local(tool) => f.debug_tuple("Local").field(&tool.name()).finish(),
        }
    }
}

/// Locally executable tools, keyed by name
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; names must be unique
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolkitError::DuplicateTool(name));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Invoke a tool by name
    pub async fn invoke(&self, name: &str, input: &Value) -> Result<ToolOutcome> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolkitError::ToolNotFound(name.to_string()))?;

        Ok(tool.call(input).await)
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
