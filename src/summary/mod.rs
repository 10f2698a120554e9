//! Summaries and follow-up answers from pluggable AI backends.
//!
//! The pipeline only sees [`SummaryBackend`]; the three variants (a local
//! OpenAI-compatible assistant, OpenAI and Anthropic) are chosen once from
//! [`Settings`] by [`build_backend`].

mod anthropic;
mod chat;
mod follow_up;

pub use anthropic::AnthropicBackend;
pub use chat::ChatCompletionsBackend;
pub use follow_up::{ConversationContext, FollowUpEngine};

use crate::config::{BackendKind, Creativity, Prompts, Settings};
use crate::error::{RecapError, Result};
use crate::transcript::Transcript;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// A single prompt sent to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Trait for AI backends that turn a prompt into text.
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Issue one completion request.
    async fn complete(&self, request: &CompletionRequest, cancel: &CancellationToken)
        -> Result<String>;
}

/// Per-run options for summaries and follow-ups.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOptions {
    pub creativity: Creativity,
    /// Output language. None = the transcript's language.
    pub language: Option<String>,
    /// Longer transcripts are truncated before prompting.
    pub max_transcript_chars: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            creativity: Creativity::default(),
            language: None,
            max_transcript_chars: 120_000,
        }
    }
}

impl SummaryOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            creativity: settings.backend.creativity,
            language: settings.summary.language.clone().filter(|l| !l.trim().is_empty()),
            max_transcript_chars: settings.summary.max_transcript_chars,
        }
    }

    /// Language phrase used in prompts.
    pub(crate) fn output_language(&self, transcript: &Transcript) -> String {
        match &self.language {
            Some(language) => language.clone(),
            None => format!("the language of the transcript ({})", transcript.language),
        }
    }
}

/// Build the configured backend, checking tokens before any request is made.
pub fn build_backend(settings: &Settings) -> Result<Arc<dyn SummaryBackend>> {
    let kind = settings.backend.kind;
    let model = settings.backend_model().trim();
    if model.is_empty() {
        return Err(RecapError::SummaryBackend {
            backend: kind,
            cause: "no model configured".to_string(),
        });
    }

    let backend: Arc<dyn SummaryBackend> = match kind {
        BackendKind::Local => Arc::new(ChatCompletionsBackend::local(
            &settings.local.base_url,
            model,
        )?),
        BackendKind::OpenAi => {
            let api_key = settings
                .openai_api_key()
                .ok_or_else(|| missing_token(kind, "openai.api_key", "OPENAI_API_KEY"))?;
            Arc::new(ChatCompletionsBackend::openai(&api_key, model)?)
        }
        BackendKind::Anthropic => {
            let api_key = settings
                .anthropic_api_key()
                .ok_or_else(|| missing_token(kind, "anthropic.api_key", "ANTHROPIC_API_KEY"))?;
            Arc::new(AnthropicBackend::new(
                &settings.anthropic.base_url,
                &api_key,
                model,
                settings.anthropic.max_tokens,
            )?)
        }
    };

    info!("Using {} backend with model {}", kind, model);
    Ok(backend)
}

fn missing_token(backend: BackendKind, key: &str, env: &str) -> RecapError {
    RecapError::SummaryBackend {
        backend,
        cause: format!("missing API token; set {} in the config file or {}", key, env),
    }
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Produces the summary of a transcript with one backend request.
#[derive(Clone)]
pub struct SummaryEngine {
    backend: Arc<dyn SummaryBackend>,
    prompts: Prompts,
}

impl SummaryEngine {
    pub fn new(backend: Arc<dyn SummaryBackend>) -> Self {
        Self {
            backend,
            prompts: Prompts::default(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Summarize `transcript` of the video titled `title`.
    #[instrument(skip_all, fields(backend = %self.backend.kind(), chars = transcript.text.len()))]
    pub async fn summarize(
        &self,
        transcript: &Transcript,
        title: &str,
        options: &SummaryOptions,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let text = truncate_chars(&transcript.text, options.max_transcript_chars);
        if text.len() < transcript.text.len() {
            warn!(
                "Transcript truncated to {} characters for summarization",
                options.max_transcript_chars
            );
        }

        let mut vars = HashMap::new();
        vars.insert("title".to_string(), title.to_string());
        vars.insert("transcript".to_string(), text.to_string());
        vars.insert("language".to_string(), options.output_language(transcript));

        let request = CompletionRequest {
            system: self.prompts.render_with_custom(&self.prompts.summary.system, &vars),
            user: self.prompts.render_with_custom(&self.prompts.summary.user, &vars),
            temperature: options.creativity.temperature(),
        };

        complete_once(self.backend.as_ref(), &request, cancel).await
    }
}

/// Run one request and normalise failures to [`RecapError::SummaryBackend`].
pub(crate) async fn complete_once(
    backend: &dyn SummaryBackend,
    request: &CompletionRequest,
    cancel: &CancellationToken,
) -> Result<String> {
    let kind = backend.kind();
    let answer = backend
        .complete(request, cancel)
        .await
        .map_err(|e| e.for_backend(kind))?;

    let answer = answer.trim();
    if answer.is_empty() {
        return Err(RecapError::SummaryBackend {
            backend: kind,
            cause: "backend returned an empty response".to_string(),
        });
    }
    Ok(answer.to_string())
}
