//! Backend for OpenAI and OpenAI-compatible local chat servers.

use super::{CompletionRequest, SummaryBackend};
use crate::cancel::or_cancelled;
use crate::config::BackendKind;
use crate::error::{RecapError, Result};
use crate::openai::{create_client, create_local_client};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Chat-completions backend. Serves both [`BackendKind::OpenAi`] and
/// [`BackendKind::Local`], which differ only in base URL and token.
pub struct ChatCompletionsBackend {
    kind: BackendKind,
    client: Client<OpenAIConfig>,
    model: String,
}

impl ChatCompletionsBackend {
    pub fn openai(api_key: &str, model: &str) -> Result<Self> {
        Ok(Self {
            kind: BackendKind::OpenAi,
            client: create_client(api_key)?,
            model: model.to_string(),
        })
    }

    pub fn local(base_url: &str, model: &str) -> Result<Self> {
        Ok(Self {
            kind: BackendKind::Local,
            client: create_local_client(base_url)?,
            model: model.to_string(),
        })
    }

    fn backend_error(&self, cause: impl ToString) -> RecapError {
        RecapError::SummaryBackend {
            backend: self.kind,
            cause: cause.to_string(),
        }
    }
}

#[async_trait]
impl SummaryBackend for ChatCompletionsBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(backend = %self.kind, model = %self.model))]
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()
                .map_err(|e| self.backend_error(e))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user.clone())
                .build()
                .map_err(|e| self.backend_error(e))?
                .into(),
        ];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(request.temperature)
            .build()
            .map_err(|e| self.backend_error(e))?;

        let chat = self.client.chat();
        let response = or_cancelled(cancel, chat.create(chat_request))
            .await?
            .map_err(|e| self.backend_error(format!("request failed: {}", e)))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| self.backend_error("empty response"))?;

        debug!("Received {} characters", answer.len());
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_kind() {
        let local = ChatCompletionsBackend::local("http://localhost:1234/v1/", "llama").unwrap();
        assert_eq!(local.kind(), BackendKind::Local);
        assert_eq!(local.model(), "llama");

        let openai = ChatCompletionsBackend::openai("sk-test", "gpt-4o-mini").unwrap();
        assert_eq!(openai.kind(), BackendKind::OpenAi);
    }

    #[tokio::test]
    async fn test_cancelled_before_request() {
        let backend = ChatCompletionsBackend::local("http://127.0.0.1:9/v1", "m").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let request = CompletionRequest {
            system: "s".to_string(),
            user: "u".to_string(),
            temperature: 0.4,
        };
        let result = backend.complete(&request, &cancel).await;
        assert!(matches!(result, Err(RecapError::Cancelled)));
    }
}
