//! Metadata provider backed by yt-dlp.

use super::{format_duration, MetadataProvider, VideoMetadata, VideoReference};
use crate::cancel::or_cancelled;
use crate::error::{RecapError, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Reads video metadata with `yt-dlp --dump-json`.
#[derive(Debug, Clone)]
pub struct YtDlpMetadataProvider {
    binary: String,
}

impl YtDlpMetadataProvider {
    pub fn new() -> Self {
        Self::with_binary("yt-dlp")
    }

    /// Use a specific yt-dlp executable.
    pub fn with_binary(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }
}

impl Default for YtDlpMetadataProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataProvider for YtDlpMetadataProvider {
    #[instrument(skip(self, cancel), fields(video = %video))]
    async fn fetch_metadata(
        &self,
        video: &VideoReference,
        cancel: &CancellationToken,
    ) -> Result<VideoMetadata> {
        let mut command = tokio::process::Command::new(&self.binary);
        command
            .args([
                "--dump-json",
                "--no-download",
                "--no-warnings",
                "--no-playlist",
                video.watch_url(),
            ])
            .kill_on_drop(true);

        let output = or_cancelled(cancel, command.output()).await?.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RecapError::ToolNotFound(self.binary.clone())
            } else {
                RecapError::MetadataFetch(format!("Failed to run {}: {}", self.binary, e))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecapError::MetadataFetch(format!(
                "Video {} not found or unavailable: {}",
                video,
                stderr.trim()
            )));
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            RecapError::MetadataFetch(format!("Failed to parse yt-dlp output: {}", e))
        })?;

        debug!("yt-dlp returned metadata for {}", video);
        Ok(metadata_from_json(&json, video))
    }
}

/// Map yt-dlp's JSON dump onto [`VideoMetadata`].
fn metadata_from_json(json: &serde_json::Value, video: &VideoReference) -> VideoMetadata {
    let text = |key: &str| json[key].as_str().filter(|s| !s.is_empty()).map(str::to_string);

    let published = json["upload_date"].as_str().and_then(|date| {
        // yt-dlp returns date as YYYYMMDD
        chrono::NaiveDate::parse_from_str(date, "%Y%m%d").ok()
    });

    VideoMetadata {
        title: text("title").unwrap_or_else(|| "Unknown Title".to_string()),
        channel_name: text("channel")
            .or_else(|| text("uploader"))
            .unwrap_or_else(|| "Unknown Channel".to_string()),
        channel_url: text("channel_url").or_else(|| text("uploader_url")),
        thumbnail_url: text("thumbnail"),
        published,
        duration: json["duration"].as_f64().map(|d| format_duration(d as u64)),
        view_count: json["view_count"].as_u64(),
        video_url: text("webpage_url").unwrap_or_else(|| video.watch_url().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_from_json() {
        let video = VideoReference::new("dQw4w9WgXcQ").unwrap();
        let json = serde_json::json!({
            "title": "Never Gonna Give You Up",
            "uploader": "Rick Astley",
            "uploader_url": "https://www.youtube.com/@RickAstleyYT",
            "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg",
            "upload_date": "20091025",
            "duration": 213.0,
            "view_count": 1500000000u64,
            "webpage_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        });

        let metadata = metadata_from_json(&json, &video);
        assert_eq!(metadata.title, "Never Gonna Give You Up");
        assert_eq!(metadata.channel_name, "Rick Astley");
        assert_eq!(
            metadata.channel_url.as_deref(),
            Some("https://www.youtube.com/@RickAstleyYT")
        );
        assert_eq!(
            metadata.published,
            chrono::NaiveDate::from_ymd_opt(2009, 10, 25)
        );
        assert_eq!(metadata.duration.as_deref(), Some("3:33"));
        assert_eq!(metadata.view_count, Some(1_500_000_000));
    }

    #[test]
    fn test_metadata_from_sparse_json() {
        let video = VideoReference::new("dQw4w9WgXcQ").unwrap();
        let metadata = metadata_from_json(&serde_json::json!({ "upload_date": "bogus" }), &video);
        assert_eq!(metadata.title, "Unknown Title");
        assert_eq!(metadata.channel_name, "Unknown Channel");
        assert_eq!(metadata.published, None);
        assert_eq!(metadata.video_url, video.watch_url());
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let provider = YtDlpMetadataProvider::with_binary("recap-test-no-such-binary");
        let video = VideoReference::new("dQw4w9WgXcQ").unwrap();
        let err = provider
            .fetch_metadata(&video, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RecapError::ToolNotFound(_)));
    }
}
