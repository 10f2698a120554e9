//! Video display metadata.

use super::VideoReference;
use crate::error::{RecapError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Display metadata for one video, snapshotted once per pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Title.
    pub title: String,
    /// Channel name.
    pub channel_name: String,
    /// Channel profile URL (if available).
    pub channel_url: Option<String>,
    /// Thumbnail URL (if available).
    pub thumbnail_url: Option<String>,
    /// Publication date (if available).
    pub published: Option<NaiveDate>,
    /// Human-readable duration, e.g. "1:02:03" (if known).
    pub duration: Option<String>,
    /// View count (if known).
    pub view_count: Option<u64>,
    /// Canonical video URL.
    pub video_url: String,
}

impl VideoMetadata {
    /// View count with thousands separators, e.g. "1,234,567".
    pub fn formatted_views(&self) -> Option<String> {
        self.view_count.map(|count| {
            let digits = count.to_string();
            let mut out = String::with_capacity(digits.len() + digits.len() / 3);
            for (i, ch) in digits.chars().enumerate() {
                if i > 0 && (digits.len() - i) % 3 == 0 {
                    out.push(',');
                }
                out.push(ch);
            }
            out
        })
    }
}

/// Format seconds as M:SS or H:MM:SS.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Trait for video metadata providers.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch display metadata for a video.
    async fn fetch_metadata(
        &self,
        video: &VideoReference,
        cancel: &CancellationToken,
    ) -> Result<VideoMetadata>;
}

/// Fetches metadata once per call, wrapping any provider failure for display.
#[derive(Clone)]
pub struct VideoMetadataFetcher {
    provider: Arc<dyn MetadataProvider>,
}

impl VideoMetadataFetcher {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self { provider }
    }

    /// Fetch metadata. There is no retry; a failed run is retried by the user.
    #[instrument(skip(self, cancel), fields(video = %video))]
    pub async fn fetch(
        &self,
        video: &VideoReference,
        cancel: &CancellationToken,
    ) -> Result<VideoMetadata> {
        let metadata = self
            .provider
            .fetch_metadata(video, cancel)
            .await
            .map_err(|e| match e {
                RecapError::Cancelled | RecapError::MetadataFetch(_) => e,
                other => RecapError::MetadataFetch(other.to_string()),
            })?;

        info!("Fetched metadata: {}", metadata.title);
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MetadataProvider for FailingProvider {
        async fn fetch_metadata(
            &self,
            _video: &VideoReference,
            _cancel: &CancellationToken,
        ) -> Result<VideoMetadata> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RecapError::ToolNotFound("yt-dlp".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failures_are_wrapped_and_not_retried() {
        let provider = Arc::new(FailingProvider {
            calls: AtomicUsize::new(0),
        });
        let fetcher = VideoMetadataFetcher::new(provider.clone());
        let video = VideoReference::new("dQw4w9WgXcQ").unwrap();

        let err = fetcher
            .fetch(&video, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            RecapError::MetadataFetch(cause) => assert!(cause.contains("yt-dlp")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(754), "12:34");
        assert_eq!(format_duration(3723), "1:02:03");
    }

    #[test]
    fn test_formatted_views() {
        let mut metadata = VideoMetadata {
            title: "Talk".to_string(),
            channel_name: "Ch".to_string(),
            channel_url: None,
            thumbnail_url: None,
            published: None,
            duration: None,
            view_count: Some(1_234_567),
            video_url: "https://www.youtube.com/watch?v=abc123".to_string(),
        };
        assert_eq!(metadata.formatted_views().as_deref(), Some("1,234,567"));
        metadata.view_count = Some(999);
        assert_eq!(metadata.formatted_views().as_deref(), Some("999"));
        metadata.view_count = None;
        assert_eq!(metadata.formatted_views(), None);
    }
}
