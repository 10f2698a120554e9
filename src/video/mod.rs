//! YouTube video references, validation and metadata.

mod metadata;
mod resolver;
mod ytdlp;

pub use metadata::{format_duration, MetadataProvider, VideoMetadata, VideoMetadataFetcher};
pub use resolver::{is_watch_url, resolve_active_video};
pub use ytdlp::YtDlpMetadataProvider;

use crate::error::{RecapError, Result};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("Invalid regex"));

static CANONICAL_VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("Invalid regex"));

const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

/// An immutable reference to one YouTube video.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoReference {
    id: String,
    watch_url: String,
}

impl VideoReference {
    /// Build a reference from an identifier that passed validation.
    pub(crate) fn from_valid_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            watch_url: format!("https://www.youtube.com/watch?v={}", id),
        }
    }

    /// Create a reference from a bare video identifier.
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();
        if is_valid_video_id(id) {
            Ok(Self::from_valid_id(id))
        } else {
            Err(RecapError::InvalidVideoReference(format!(
                "'{}' is not a valid video identifier",
                id
            )))
        }
    }

    /// Parse a full YouTube URL (watch, youtu.be, embed, shorts, live) or a bare
    /// 11-character identifier.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if CANONICAL_VIDEO_ID.is_match(input) {
            return Ok(Self::from_valid_id(input));
        }
        extract_video_id(input)
            .map(|id| Self::from_valid_id(&id))
            .ok_or_else(|| {
                RecapError::InvalidVideoReference(format!(
                    "'{}' is neither a YouTube video URL nor a video identifier",
                    input
                ))
            })
    }

    /// The video identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Canonical `https://www.youtube.com/watch?v=<id>` URL.
    pub fn watch_url(&self) -> &str {
        &self.watch_url
    }
}

impl std::fmt::Display for VideoReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Whether `id` is shaped like a YouTube video identifier.
pub fn is_valid_video_id(id: &str) -> bool {
    VIDEO_ID.is_match(id)
}

/// Whether `url` is a YouTube video URL carrying a valid identifier.
pub fn is_valid_video_url(url: &str) -> bool {
    extract_video_id(url).is_some()
}

/// Extract the video identifier from a YouTube URL.
pub fn extract_video_id(input: &str) -> Option<String> {
    let url = Url::parse(input.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();

    let candidate = if host == "youtu.be" {
        url.path_segments()?.next().map(str::to_string)
    } else if YOUTUBE_HOSTS.contains(&host.as_str()) {
        let mut segments = url.path_segments()?;
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("embed" | "shorts" | "live" | "v") => segments.next().map(str::to_string),
            _ => None,
        }
    } else {
        None
    };

    candidate.filter(|id| is_valid_video_id(id))
}
