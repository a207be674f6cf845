//! # toolkit-runtime
//!
//! Provider transports for toolkit-core.
//!
//! ## Providers
//!
//! - **Claude** (default): Anthropic Messages API
//! - **Bedrock** (default): Anthropic models through AWS Bedrock `InvokeModel`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toolkit_runtime::ClaudeProvider;
//!
//! let provider = ClaudeProvider::from_env()?;
//! let client = Client::new(Arc::new(provider));
//! let responses = client.request(builder, &RequestOptions::default()).await?;
//! ```

#[cfg(any(feature = "claude", feature = "bedrock"))]
mod http;

#[cfg(feature = "claude")]
pub mod claude;

#[cfg(feature = "bedrock")]
pub mod bedrock;

#[cfg(feature = "claude")]
pub use claude::{ClaudeConfig, ClaudeProvider};

#[cfg(feature = "bedrock")]
pub use bedrock::{BedrockConfig, BedrockProvider};

// Re-export core types for convenience
pub use toolkit_core::{
    Client, Provider, RequestBuilder, RequestOptions, ResponseCollection, Result, Role, Tool,
    ToolkitError,
};
