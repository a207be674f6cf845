//! HTTP plumbing shared by the transports

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use toolkit_core::error::{Result, ToolkitError};

pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ToolkitError::Config(format!("failed to build HTTP client: {e}")))
}

/// Send a JSON body and parse the JSON reply, timing the round trip
pub(crate) async fn send_json<B: Serialize + Sync>(
    request: reqwest::RequestBuilder,
    body: &B,
    provider: &str,
) -> Result<(Value, Duration)> {
    let started = Instant::now();

    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| ToolkitError::ProviderUnavailable(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ToolkitError::ProviderUnavailable(e.to_string()))?;
    let elapsed = started.elapsed();

    if !status.is_success() {
        tracing::warn!(provider, status = status.as_u16(), "Request failed");
        return Err(status_error(status.as_u16(), &text));
    }

    Ok((serde_json::from_str(&text)?, elapsed))
}

/// Map a non-success HTTP status to an error
pub(crate) fn status_error(status: u16, body: &str) -> ToolkitError {
    let message = error_message(body);
    match status {
        401 | 403 => ToolkitError::Auth(message),
        429 => ToolkitError::RateLimited(message),
        500..=599 => ToolkitError::ProviderUnavailable(format!("HTTP {status}: {message}")),
        _ => ToolkitError::Provider(format!("HTTP {status}: {message}")),
    }
}

/// Pull the message out of an API error body, falling back to the raw text
///
/// Anthropic nests it under `error.message`; AWS puts `message` (or
/// `Message`) at the top level.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            [&v["error"]["message"], &v["message"], &v["Message"]]
                .into_iter()
                .find_map(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
