//! Scripted Provider
//!
//! In-memory provider that replays canned payloads. Useful for tests and for
//! exercising hooks and tools without a network.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Mutex, PoisonError};

use crate::error::{Result, ToolkitError};
use crate::normalize::normalize_payload;
use crate::provider::{Provider, ProviderPayload, ProviderRequest};

/// Provider that returns predefined raw payloads in order
///
/// Once the script runs out the last payload is repeated. Every request is
/// recorded and can be inspected afterwards.
pub struct ScriptedProvider {
    responses: Vec<Value>,
    model: Option<String>,
    index: Mutex<usize>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Value>) -> Self {
        Self {
            responses,
            model: None,
            index: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests().pop()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn next_raw(&self) -> Option<Value> {
        let mut index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        let raw = self.responses.get(*index).cloned();
        if *index + 1 < self.responses.len() {
            *index += 1;
        }
        raw
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model_identifier(&self) -> Option<&str> {
        self.model.as_deref()
    }

    async fn call(&self, request: &ProviderRequest) -> Result<ProviderPayload> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let raw = self
            .next_raw()
            .ok_or_else(|| ToolkitError::Provider("scripted provider has no responses".into()))?;

        normalize_payload(&raw)
    }
}
