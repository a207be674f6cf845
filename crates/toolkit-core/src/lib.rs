//! # toolkit-core
//!
//! Provider-agnostic request orchestration with an agentic tool loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Client                              │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────────┐  │
//! │  │ before/after │  │   Request    │  │     Provider       │  │
//! │  │    hooks     │──│    Loop      │──│    (Strategy)      │  │
//! │  └──────────────┘  └──────┬───────┘  └────────────────────┘  │
//! │                           │                                   │
//! │                    ┌──────┴───────┐                           │
//! │                    │ ToolRegistry │                           │
//! │                    └──────────────┘                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A [`RequestBuilder`] collects the system prompt, messages and tools. The
//! [`Client`] sends them through a [`Provider`], executes any local tools the
//! model asks for and returns every call as a [`ResponseCollection`].
//!
//! The `Provider` trait hides the wire format, so the loop works the same
//! against Claude, a scripted test double or any other backend.

pub mod builder;
pub mod client;
pub mod error;
pub mod message;
pub mod normalize;
pub mod provider;
pub mod response;
pub mod result;
pub mod scripted;
pub mod tool;

pub use builder::RequestBuilder;
pub use client::{AfterRequestHook, BeforeRequestHook, Client, HookContext, RequestOptions};
pub use error::{Result, ToolkitError};
pub use message::{ChatMessage, Role};
pub use normalize::normalize_payload;
pub use provider::{Provider, ProviderPayload, ProviderRequest, StopReason, TokenUsage, ToolUse};
pub use response::{Response, ResponseCollection};
pub use result::ResultItem;
pub use scripted::ScriptedProvider;
pub use tool::{ServerTool, Tool, ToolDeclaration, ToolError, ToolOutcome, ToolRegistry};
