//! Transcript acquisition with language fallback.
//!
//! A provider is asked for captions one language at a time. "No track for
//! this language" moves on to the next language; running out of languages is
//! a normal outcome ([`TranscriptOutcome::Unavailable`]), while any other
//! provider failure is reported as [`RecapError::TranscriptFetch`].

mod youtube;

pub use youtube::YoutubeCaptionProvider;

use crate::error::{RecapError, Result};
use crate::video::VideoReference;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Caption text of one video in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// Concatenated caption text.
    pub text: String,
    /// Language code the transcript was resolved in.
    pub language: String,
}

/// Result of a transcript lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptOutcome {
    /// A transcript was found.
    Found(Transcript),
    /// The video has no captions in any attempted language.
    Unavailable {
        /// Languages that were tried, in order.
        attempted: Vec<String>,
    },
}

/// Failure reported by a [`TranscriptProvider`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranscriptProviderError {
    /// The video has captions, but none in this language.
    #[error("no caption track for language '{0}'")]
    NotFoundForLanguage(String),

    /// The video has no caption tracks at all (e.g. a live stream or premiere).
    #[error("video has no captions")]
    NoCaptions,

    /// Network failure, blocked video, malformed caption payload, ...
    #[error("{0}")]
    Other(String),

    #[error("cancelled")]
    Cancelled,
}

impl From<RecapError> for TranscriptProviderError {
    fn from(err: RecapError) -> Self {
        match err {
            RecapError::Cancelled => TranscriptProviderError::Cancelled,
            other => TranscriptProviderError::Other(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for TranscriptProviderError {
    fn from(err: reqwest::Error) -> Self {
        TranscriptProviderError::Other(err.to_string())
    }
}

/// Trait for caption sources.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// Fetch the caption text of `video` in `language`.
    async fn fetch_transcript(
        &self,
        video: &VideoReference,
        language: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<String, TranscriptProviderError>;
}

/// Ordered list of languages to try: the primary one, then the fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePriority {
    primary: String,
    fallbacks: Vec<String>,
}

impl LanguagePriority {
    pub fn new(primary: impl Into<String>, fallbacks: Vec<String>) -> Self {
        Self {
            primary: primary.into(),
            fallbacks,
        }
    }

    /// Languages in attempt order, blanks and case-insensitive duplicates removed.
    pub fn ordered(&self) -> Vec<&str> {
        let mut ordered: Vec<&str> = Vec::with_capacity(self.fallbacks.len() + 1);
        for language in std::iter::once(&self.primary).chain(&self.fallbacks) {
            let language = language.trim();
            if language.is_empty() || ordered.iter().any(|l| l.eq_ignore_ascii_case(language)) {
                continue;
            }
            ordered.push(language);
        }
        ordered
    }
}

impl Default for LanguagePriority {
    fn default() -> Self {
        Self::new("en", Vec::new())
    }
}

/// Resolves the best available transcript for a video.
#[derive(Clone)]
pub struct TranscriptFetcher {
    provider: Arc<dyn TranscriptProvider>,
}

impl TranscriptFetcher {
    pub fn new(provider: Arc<dyn TranscriptProvider>) -> Self {
        Self { provider }
    }

    /// Try each language in priority order, one provider call per language.
    #[instrument(skip(self, languages, cancel), fields(video = %video))]
    pub async fn fetch(
        &self,
        video: &VideoReference,
        languages: &LanguagePriority,
        cancel: &CancellationToken,
    ) -> Result<TranscriptOutcome> {
        let mut attempted = Vec::new();

        for language in languages.ordered() {
            if cancel.is_cancelled() {
                return Err(RecapError::Cancelled);
            }
            attempted.push(language.to_string());

            match self.provider.fetch_transcript(video, language, cancel).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!("Transcript found in '{}' ({} chars)", language, text.len());
                    return Ok(TranscriptOutcome::Found(Transcript {
                        text,
                        language: language.to_string(),
                    }));
                }
                Ok(_) => {
                    warn!("Transcript in '{}' was empty, trying next language", language);
                }
                Err(TranscriptProviderError::NotFoundForLanguage(_)) => {
                    debug!("No captions in '{}', trying next language", language);
                }
                Err(TranscriptProviderError::NoCaptions) => {
                    info!("Video has no caption tracks");
                    return Ok(TranscriptOutcome::Unavailable { attempted });
                }
                Err(TranscriptProviderError::Cancelled) => return Err(RecapError::Cancelled),
                Err(TranscriptProviderError::Other(cause)) => {
                    return Err(RecapError::TranscriptFetch(cause));
                }
            }
        }

        info!("No transcript in any of: {}", attempted.join(", "));
        Ok(TranscriptOutcome::Unavailable { attempted })
    }
}
