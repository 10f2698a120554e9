//! Anthropic Messages API backend.

use super::{CompletionRequest, SummaryBackend};
use crate::cancel::or_cancelled;
use crate::config::BackendKind;
use crate::error::{RecapError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const API_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 300;
/// The Messages API rejects temperatures above this.
const MAX_TEMPERATURE: f32 = 1.0;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

pub struct AnthropicBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicBackend {
    pub fn new(base_url: &str, api_key: &str, model: &str, max_tokens: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens,
        })
    }

    fn backend_error(cause: impl ToString) -> RecapError {
        RecapError::SummaryBackend {
            backend: BackendKind::Anthropic,
            cause: cause.to_string(),
        }
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: &request.system,
            temperature: request.temperature.min(MAX_TEMPERATURE),
            messages: vec![Message {
                role: "user",
                content: &request.user,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::backend_error(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response.text().await.map_err(Self::backend_error)?;

        if !status.is_success() {
            return Err(Self::backend_error(error_message(status, &text)));
        }

        parse_response(&text)
    }
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => format!("{} ({}): {}", status, parsed.error.kind, parsed.error.message),
        Err(_) => format!("{}: {}", status, body.trim()),
    }
}

fn parse_response(body: &str) -> Result<String> {
    let parsed: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| AnthropicBackend::backend_error(format!("malformed response: {}", e)))?;

    let text: Vec<String> = parsed
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();

    if text.is_empty() {
        return Err(AnthropicBackend::backend_error("empty response"));
    }
    Ok(text.join(""))
}

#[async_trait]
impl SummaryBackend for AnthropicBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let answer = or_cancelled(cancel, self.send(request)).await??;
        debug!("Received {} characters", answer.len());
        Ok(answer)
    }
}
