//! Follow-up questions about a summarized video.

use super::{complete_once, truncate_chars, CompletionRequest, SummaryBackend, SummaryOptions};
use crate::config::Prompts;
use crate::error::{RecapError, Result};
use crate::transcript::Transcript;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Everything a follow-up needs, retained from a finished run.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    pub transcript: Arc<Transcript>,
    pub title: String,
    /// The summary, or the most recent follow-up answer.
    pub latest_answer: String,
}

/// Answers questions from the retained transcript and latest answer.
///
/// Never refetches anything: each question costs exactly one backend call.
#[derive(Clone)]
pub struct FollowUpEngine {
    backend: Arc<dyn SummaryBackend>,
    prompts: Prompts,
}

impl FollowUpEngine {
    pub fn new(backend: Arc<dyn SummaryBackend>) -> Self {
        Self {
            backend,
            prompts: Prompts::default(),
        }
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    #[instrument(skip(self, context, options, cancel), fields(backend = %self.backend.kind()))]
    pub async fn answer(
        &self,
        context: &ConversationContext,
        question: &str,
        options: &SummaryOptions,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RecapError::InvalidInput("question is empty".to_string()));
        }
        info!("Answering follow-up question");

        let transcript = truncate_chars(&context.transcript.text, options.max_transcript_chars);

        let mut vars = HashMap::new();
        vars.insert("title".to_string(), context.title.clone());
        vars.insert("transcript".to_string(), transcript.to_string());
        vars.insert("previous_answer".to_string(), context.latest_answer.clone());
        vars.insert("question".to_string(), question.to_string());
        vars.insert("language".to_string(), options.output_language(&context.transcript));

        let request = CompletionRequest {
            system: self.prompts.render_with_custom(&self.prompts.follow_up.system, &vars),
            user: self.prompts.render_with_custom(&self.prompts.follow_up.user, &vars),
            temperature: options.creativity.temperature(),
        };

        complete_once(self.backend.as_ref(), &request, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::tests::CannedBackend;

    fn context() -> ConversationContext {
        ConversationContext {
            transcript: Arc::new(Transcript {
                text: "the talk covers X and Y".to_string(),
                language: "en".to_string(),
            }),
            title: "Talk".to_string(),
            latest_answer: "Summary: talk about X.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_answer_includes_context() {
        let backend = CannedBackend::new(vec![Ok("It also covers Y.".to_string())]);
        let engine = FollowUpEngine::new(backend.clone());

        let answer = engine
            .answer(&context(), "What else?", &SummaryOptions::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(answer, "It also covers Y.");

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let user = &requests[0].user;
        assert!(user.contains("the talk covers X and Y"));
        assert!(user.contains("Summary: talk about X."));
        assert!(user.contains("What else?"));
        assert!(user.contains("the language of the transcript (en)"));
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected_without_calling_backend() {
        let backend = CannedBackend::new(vec![]);
        let engine = FollowUpEngine::new(backend.clone());

        let result = engine
            .answer(&context(), "   ", &SummaryOptions::default(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(RecapError::InvalidInput(_))));
        assert_eq!(backend.calls(), 0);
    }
}
