//! Responses
//!
//! A [`Response`] wraps one provider call; a [`ResponseCollection`] is the whole
//! run, in call order, with aggregate usage.

use serde::Serialize;
use std::ops::Index;
use std::time::Duration;

use crate::message::ChatMessage;
use crate::provider::{ProviderPayload, StopReason, ToolUse};
use crate::result::ResultItem;

/// Outcome of a single provider call
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Response {
    stop_reason: StopReason,
    messages: Vec<ChatMessage>,
    tool_uses: Vec<ToolUse>,
    results: Vec<ResultItem>,
    execution_time: Option<Duration>,
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

impl Response {
    /// Build a response from a normalized payload
    ///
    /// Emitted messages become message results and unplaced fragments become
    /// unknown results. Tool items are added later by the client.
    pub fn from_payload(payload: ProviderPayload) -> Self {
        let ProviderPayload {
            stop_reason,
            messages,
            tool_uses,
            unknown,
            usage,
            execution_time,
        } = payload;

        let mut results: Vec<ResultItem> = messages
            .iter()
            .map(|m| ResultItem::message(m.role.clone(), m.content.clone()))
            .collect();
        results.extend(unknown.into_iter().map(|json| ResultItem::Unknown { json }));

        let usage = usage.unwrap_or_default();
        Self {
            stop_reason,
            messages,
            tool_uses,
            results,
            execution_time,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        }
    }

    pub fn stop_reason(&self) -> &StopReason {
        &self.stop_reason
    }

    /// Messages emitted by the provider for this call
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Tool-use requests emitted by the provider for this call
    pub fn tool_uses(&self) -> &[ToolUse] {
        &self.tool_uses
    }

    pub fn results(&self) -> &[ResultItem] {
        &self.results
    }

    pub fn execution_time(&self) -> Option<Duration> {
        self.execution_time
    }

    pub fn input_tokens(&self) -> Option<u64> {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> Option<u64> {
        self.output_tokens
    }

    pub(crate) fn push_result(&mut self, item: ResultItem) {
        self.results.push(item);
    }

    /// Record tool-use requests that will not be executed
    pub(crate) fn record_pending_tool_requests(&mut self) {
        for tool_use in &self.tool_uses {
            self.results.push(ResultItem::tool_request(
                tool_use.id.clone(),
                tool_use.name.clone(),
                tool_use.input.clone(),
            ));
        }
    }

    pub(crate) fn mark_tool_stop(&mut self) {
        self.stop_reason = StopReason::ToolStop;
    }
}

/// All responses from one client request, with aggregate usage stats
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResponseCollection {
    responses: Vec<Response>,
    total_input_tokens: u64,
    total_output_tokens: u64,
    total_execution_time: Duration,
    all_results: Vec<ResultItem>,
}

impl ResponseCollection {
    pub fn new(responses: Vec<Response>) -> Self {
        let total_input_tokens = responses
            .iter()
            .filter_map(Response::input_tokens)
            .fold(0, u64::saturating_add);
        let total_output_tokens = responses
            .iter()
            .filter_map(Response::output_tokens)
            .fold(0, u64::saturating_add);
        let total_execution_time = responses
            .iter()
            .filter_map(Response::execution_time)
            .fold(Duration::ZERO, Duration::saturating_add);
        let all_results = responses
            .iter()
            .flat_map(|r| r.results().iter().cloned())
            .collect();

        Self {
            responses,
            total_input_tokens,
            total_output_tokens,
            total_execution_time,
            all_results,
        }
    }

    pub fn total_input_tokens(&self) -> u64 {
        self.total_input_tokens
    }

    pub fn total_output_tokens(&self) -> u64 {
        self.total_output_tokens
    }

    pub fn total_execution_time(&self) -> Duration {
        self.total_execution_time
    }

    /// Results of every call, flattened in order
    pub fn all_results(&self) -> &[ResultItem] {
        &self.all_results
    }

    /// Stop reason of the final call
    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.last().map(Response::stop_reason)
    }

    /// Messages emitted by the final call
    pub fn messages(&self) -> &[ChatMessage] {
        self.last().map(Response::messages).unwrap_or_default()
    }

    pub fn get(&self, index: usize) -> Option<&Response> {
        self.responses.get(index)
    }

    pub fn first(&self) -> Option<&Response> {
        self.responses.first()
    }

    pub fn last(&self) -> Option<&Response> {
        self.responses.last()
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Response> {
        self.responses.iter()
    }
}

impl Index<usize> for ResponseCollection {
    type Output = Response;

    fn index(&self, index: usize) -> &Response {
        &self.responses[index]
    }
}

impl<'a> IntoIterator for &'a ResponseCollection {
    type Item = &'a Response;
    type IntoIter = std::slice::Iter<'a, Response>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.iter()
    }
}

impl IntoIterator for ResponseCollection {
    type Item = Response;
    type IntoIter = std::vec::IntoIter<Response>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::TokenUsage;
    use serde_json::json;

    fn payload(input: Option<u64>, output: Option<u64>, secs: Option<u64>) -> ProviderPayload {
        let mut payload = ProviderPayload::new(StopReason::EndTurn)
            .with_message(ChatMessage::assistant("hi"))
            .with_usage(TokenUsage {
                input_tokens: input,
                output_tokens: output,
            });
        payload.execution_time = secs.map(Duration::from_secs);
        payload
    }

    #[test]
    fn test_from_payload() {
        let mut raw = payload(Some(3), None, None);
        raw.unknown.push(json!({"odd": true}));
        raw.tool_uses.push(ToolUse {
            id: "tu_1".into(),
            name: "echo".into(),
            input: json!({}),
        });

        let response = Response::from_payload(raw);
        assert_eq!(
            response.results(),
            &[
                ResultItem::message("assistant", "hi"),
                ResultItem::Unknown {
                    json: json!({"odd": true})
                },
            ]
        );
        assert_eq!(response.tool_uses().len(), 1);
        assert_eq!(response.input_tokens(), Some(3));
        assert_eq!(response.output_tokens(), None);
    }

    #[test]
    fn test_aggregates_treat_missing_values_as_zero() {
        let collection = ResponseCollection::new(vec![
            Response::from_payload(payload(Some(10), Some(4), Some(1))),
            Response::from_payload(payload(None, Some(6), None)),
            Response::from_payload(payload(Some(5), None, Some(2))),
        ]);

        assert_eq!(collection.len(), 3);
        assert_eq!(collection.total_input_tokens(), 15);
        assert_eq!(collection.total_output_tokens(), 10);
        assert_eq!(collection.total_execution_time(), Duration::from_secs(3));
        assert_eq!(collection.all_results().len(), 3);
        assert_eq!(collection.stop_reason(), Some(&StopReason::EndTurn));
    }

    #[test]
    fn test_execution_time_total_saturates() {
        let collection = ResponseCollection::new(vec![
            Response::from_payload(payload(None, None, Some(u64::MAX))),
            Response::from_payload(payload(None, None, Some(u64::MAX))),
        ]);
        assert_eq!(collection.total_execution_time(), Duration::MAX);
    }

    #[test]
    fn test_empty_collection() {
        let collection = ResponseCollection::default();
        assert!(collection.is_empty());
        assert_eq!(collection.stop_reason(), None);
        assert!(collection.messages().is_empty());
        assert_eq!(collection.total_execution_time(), Duration::ZERO);
    }
}
