//! Error Types

use thiserror::Error;

/// Result type alias for toolkit operations
pub type Result<T> = std::result::Result<T, ToolkitError>;

/// Toolkit error types
#[derive(Error, Debug)]
pub enum ToolkitError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A tool-use request named a tool with no local implementation
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// A tool with the same name was already registered
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    /// Tool input schema is not a usable JSON schema
    #[error("Invalid tool schema for '{tool}': {reason}")]
    InvalidSchema { tool: String, reason: String },

    /// The before-request hook rejected the call
    #[error("Hook error: {0}")]
    Hook(String),

    /// Provider payload could not be understood
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ToolkitError {
    /// Whether this error comes from caller configuration rather than the provider
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ToolkitError::ToolNotFound(_)
                | ToolkitError::DuplicateTool(_)
                | ToolkitError::InvalidSchema { .. }
                | ToolkitError::Config(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            ToolkitError::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            ToolkitError::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            ToolkitError::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            ToolkitError::DuplicateTool(name) => {
                format!("The tool '{name}' was registered more than once.")
            }
            ToolkitError::InvalidSchema { tool, .. } => {
                format!("The tool '{tool}' has an invalid input schema.")
            }
            ToolkitError::RateLimited(_) => {
                "You've made too many requests. Please wait a moment.".into()
            }
            ToolkitError::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(ToolkitError::ToolNotFound("echo".into()).is_configuration());
        assert!(ToolkitError::DuplicateTool("echo".into()).is_configuration());
        assert!(!ToolkitError::Provider("boom".into()).is_configuration());
        assert!(!ToolkitError::Hook("nope".into()).is_configuration());
    }

    #[test]
    fn test_user_message_hides_details() {
        let err = ToolkitError::Auth("key sk-123 rejected".into());
        assert!(!err.user_message().contains("sk-123"));
    }
}
