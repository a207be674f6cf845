//! Request Loop
//!
//! The [`Client`] drives a bounded sequence of provider calls. Whenever a call
//! stops with `tool_use` or `pause_turn` the requested local tools run, one at
//! a time and in the order the provider listed them, and their output is fed
//! back into the conversation for the next call.
//!
//! The loop ends when:
//!
//! - a call stops for any other reason (tool uses it still carries are
//!   recorded as requests but not run)
//! - `max_iterations` provider calls have been made
//! - a tool asks to stop (the stop reason becomes `tool_stop`)
//! - the after-request hook fails (the response is kept, its tools are not run)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::Instrument;

use crate::builder::{Conversation, RequestBuilder};
use crate::error::{Result, ToolkitError};
use crate::message::ChatMessage;
use crate::provider::{Provider, ProviderPayload, ProviderRequest};
use crate::response::{Response, ResponseCollection};
use crate::result::ResultItem;
use crate::tool::ToolRegistry;

/// Identifiers passed to hooks
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HookContext {
    /// Model identifier, if the provider reports one
    pub model: Option<String>,
    /// Provider name
    pub provider: String,
}

/// Runs before every provider call and may rewrite the request
///
/// An error aborts the whole request.
pub type BeforeRequestHook =
    Arc<dyn Fn(&mut ProviderRequest, &HookContext) -> anyhow::Result<()> + Send + Sync>;

/// Runs after every provider call with the request and the payload
///
/// An error is logged and ends the loop; everything produced so far is returned.
pub type AfterRequestHook = Arc<
    dyn Fn(&ProviderRequest, &ProviderPayload, &HookContext) -> anyhow::Result<()> + Send + Sync,
>;

/// Generation parameters and loop limits for one request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Run requested tools and keep calling the provider
    #[serde(default = "default_auto")]
    pub auto: bool,

    /// Maximum tokens per provider call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Maximum provider calls in auto mode
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Tool selection constraint, sent verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

fn default_auto() -> bool {
    true
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_max_iterations() -> usize {
    5
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            auto: default_auto(),
            max_tokens: default_max_tokens(),
            max_iterations: default_max_iterations(),
            tool_choice: None,
            temperature: None,
            top_k: None,
            top_p: None,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto(mut self, auto: bool) -> Self {
        self.auto = auto;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn tool_choice(mut self, tool_choice: Value) -> Self {
        self.tool_choice = Some(tool_choice);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Provider calls allowed for one request; always at least one
    fn call_limit(&self) -> usize {
        if self.auto {
            self.max_iterations.max(1)
        } else {
            1
        }
    }
}

/// Client for performing requests through a provider
#[derive(Clone)]
pub struct Client {
    provider: Arc<dyn Provider>,
    before_request: Option<BeforeRequestHook>,
    after_request: Option<AfterRequestHook>,
}

impl Client {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            before_request: None,
            after_request: None,
        }
    }

    /// Install the before-request hook
    pub fn before_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ProviderRequest, &HookContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.before_request = Some(Arc::new(hook));
        self
    }

    /// Install the after-request hook
    pub fn after_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ProviderRequest, &ProviderPayload, &HookContext) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        self.after_request = Some(Arc::new(hook));
        self
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Perform a request, running requested tools in auto mode
    ///
    /// Returns one [`Response`] per provider call. Configuration problems
    /// (such as the model asking for a tool that was never registered),
    /// before-hook failures and provider errors are returned as errors.
    pub async fn request(
        &self,
        builder: RequestBuilder,
        options: &RequestOptions,
    ) -> Result<ResponseCollection> {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::debug_span!("request", %run_id, provider = %self.provider.name());
        self.run(builder, options).instrument(span).await
    }

    async fn run(
        &self,
        builder: RequestBuilder,
        options: &RequestOptions,
    ) -> Result<ResponseCollection> {
        let (conversation, registry) = builder.into_parts();
        let Conversation {
            system_prompt,
            mut messages,
            tools,
        } = conversation;

        let limit = options.call_limit();
        let mut responses = Vec::new();

        for call in 1..=limit {
            let mut request = ProviderRequest {
                messages: messages.clone(),
                system_prompt: system_prompt.clone(),
                tools: tools.clone(),
                max_tokens: options.max_tokens,
                tool_choice: options.tool_choice.clone(),
                temperature: options.temperature,
                top_k: options.top_k,
                top_p: options.top_p,
            };

            let (payload, hook_failed) = self.perform_call(&mut request).await?;
            let mut response = Response::from_payload(payload);

            if hook_failed {
                response.record_pending_tool_requests();
                responses.push(response);
                break;
            }

            if !response.stop_reason().continues_loop() {
                response.record_pending_tool_requests();
                responses.push(response);
                break;
            }

            if call == limit {
                tracing::debug!(call, "Call limit reached, not running requested tools");
                response.record_pending_tool_requests();
                responses.push(response);
                break;
            }

            let stopped = Self::run_tools(&registry, &mut response, &mut messages).await?;
            responses.push(response);
            if stopped {
                break;
            }
        }

        let collection = ResponseCollection::new(responses);
        tracing::debug!(
            calls = collection.len(),
            input_tokens = collection.total_input_tokens(),
            output_tokens = collection.total_output_tokens(),
            "Request finished"
        );
        Ok(collection)
    }

    /// Invoke hooks and the provider for one call
    ///
    /// The flag is set when the after-request hook failed.
    async fn perform_call(&self, request: &mut ProviderRequest) -> Result<(ProviderPayload, bool)> {
        let context = self.hook_context();

        if let Some(hook) = &self.before_request {
            hook(request, &context).map_err(|e| ToolkitError::Hook(format!("{e:#}")))?;
        }

        let payload = self.provider.call(request).await?;
        tracing::debug!(
            stop_reason = %payload.stop_reason,
            messages = payload.messages.len(),
            tool_uses = payload.tool_uses.len(),
            "Provider call finished"
        );

        let mut hook_failed = false;
        if let Some(hook) = &self.after_request {
            if let Err(e) = hook(request, &payload, &context) {
                tracing::warn!(error = %format!("{e:#}"), "after_request hook failed, stopping loop");
                hook_failed = true;
            }
        }

        Ok((payload, hook_failed))
    }

    /// Execute the tool uses of one response
    ///
    /// Returns true when a tool asked to stop the loop.
    async fn run_tools(
        registry: &ToolRegistry,
        response: &mut Response,
        messages: &mut Vec<ChatMessage>,
    ) -> Result<bool> {
        let tool_uses = response.tool_uses().to_vec();

        for tool_use in tool_uses {
            response.push_result(ResultItem::tool_request(
                tool_use.id.clone(),
                tool_use.name.clone(),
                tool_use.input.clone(),
            ));
            messages.push(ChatMessage::tool_use(
                &tool_use.id,
                &tool_use.name,
                &tool_use.input,
            ));

            tracing::debug!(tool = %tool_use.name, id = %tool_use.id, "Executing tool");
            let outcome = registry.invoke(&tool_use.name, &tool_use.input).await?;
            let stop = outcome.is_terminate();
            let output = outcome.into_output();

            messages.push(ChatMessage::tool_result(&tool_use.id, &output));
            response.push_result(ResultItem::tool_response(tool_use.id.clone(), output));

            if stop {
                tracing::debug!(tool = %tool_use.name, "Tool ended the loop");
                response.mark_tool_stop();
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn hook_context(&self) -> HookContext {
        HookContext {
            model: self.provider.model_identifier().map(str::to_string),
            provider: self.provider.name().to_string(),
        }
    }
}
