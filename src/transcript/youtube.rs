//! Caption provider that reads YouTube's own caption tracks.
//!
//! The watch page embeds `ytInitialPlayerResponse`, whose
//! `captions.playerCaptionsRenderer.captionTracks` lists one timed-text URL
//! per language. The chosen track is downloaded as XML and flattened to text.

use super::{TranscriptProvider, TranscriptProviderError};
use crate::cancel::or_cancelled;
use crate::video::VideoReference;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

type ProviderResult<T> = std::result::Result<T, TranscriptProviderError>;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Default timeout for page and caption requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

static CAPTION_NODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?:text|p)\b[^>]*>(.*?)</(?:text|p)>").expect("Invalid regex")
});
static INNER_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("Invalid regex"));
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#([xX]?)([0-9a-fA-F]+);").expect("Invalid regex"));

/// One entry of `captionTracks`.
#[derive(Debug, Clone, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    /// "asr" for auto-generated tracks.
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Debug, Clone)]
enum CaptionListing {
    Tracks(Vec<CaptionTrack>),
    NoCaptions,
}

/// Reads captions straight from youtube.com.
pub struct YoutubeCaptionProvider {
    client: reqwest::Client,
    /// Caption tracks of the most recently looked-up video, so trying several
    /// languages only loads the watch page once.
    listing: Mutex<Option<(String, Arc<CaptionListing>)>>,
}

impl YoutubeCaptionProvider {
    pub fn new() -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            listing: Mutex::new(None),
        }
    }

    async fn caption_listing(
        &self,
        video: &VideoReference,
        cancel: &CancellationToken,
    ) -> ProviderResult<Arc<CaptionListing>> {
        let cached = {
            let guard = self.listing.lock().unwrap_or_else(|e| e.into_inner());
            guard
                .as_ref()
                .filter(|(id, _)| id == video.id())
                .map(|(_, listing)| listing.clone())
        };
        if let Some(listing) = cached {
            return Ok(listing);
        }

        debug!("Loading watch page for {}", video);
        let request = self
            .client
            .get(video.watch_url())
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Cookie", "CONSENT=YES+1");
        let html = or_cancelled(cancel, async {
            request.send().await?.error_for_status()?.text().await
        })
        .await??;

        let listing = Arc::new(parse_caption_listing(&html)?);
        *self.listing.lock().unwrap_or_else(|e| e.into_inner()) =
            Some((video.id().to_string(), listing.clone()));
        Ok(listing)
    }
}

#[async_trait]
impl TranscriptProvider for YoutubeCaptionProvider {
    #[instrument(skip(self, cancel), fields(video = %video))]
    async fn fetch_transcript(
        &self,
        video: &VideoReference,
        language: &str,
        cancel: &CancellationToken,
    ) -> ProviderResult<String> {
        let tracks = match self.caption_listing(video, cancel).await?.as_ref() {
            CaptionListing::NoCaptions => return Err(TranscriptProviderError::NoCaptions),
            CaptionListing::Tracks(tracks) => tracks.clone(),
        };

        let track = pick_track(&tracks, language)
            .ok_or_else(|| TranscriptProviderError::NotFoundForLanguage(language.to_string()))?;
        debug!(
            "Using caption track '{}' (generated: {})",
            track.language_code,
            track.is_generated()
        );

        let request = self.client.get(&track.base_url);
        let xml = or_cancelled(cancel, async {
            request.send().await?.error_for_status()?.text().await
        })
        .await??;

        parse_caption_xml(&xml)
    }
}

/// Read the caption tracks out of a watch page.
fn parse_caption_listing(html: &str) -> ProviderResult<CaptionListing> {
    let raw = extract_json_object(html, "ytInitialPlayerResponse").ok_or_else(|| {
        TranscriptProviderError::Other(
            "could not find the player response on the watch page".to_string(),
        )
    })?;
    let player: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
        TranscriptProviderError::Other(format!("malformed player response: {}", e))
    })?;

    let status = player["playabilityStatus"]["status"].as_str().unwrap_or("OK");
    match status {
        "OK" => {}
        // Upcoming premieres and offline live streams have no captions yet
        "LIVE_STREAM_OFFLINE" => return Ok(CaptionListing::NoCaptions),
        _ => {
            let reason = player["playabilityStatus"]["reason"].as_str().unwrap_or(status);
            return Err(TranscriptProviderError::Other(format!(
                "video is not playable: {}",
                reason
            )));
        }
    }

    let tracks = &player["captions"]["playerCaptionsRenderer"]["captionTracks"];
    if tracks.is_null() {
        return Ok(CaptionListing::NoCaptions);
    }

    let tracks: Vec<CaptionTrack> = serde_json::from_value(tracks.clone()).map_err(|e| {
        TranscriptProviderError::Other(format!("malformed caption track list: {}", e))
    })?;

    if tracks.is_empty() {
        Ok(CaptionListing::NoCaptions)
    } else {
        Ok(CaptionListing::Tracks(tracks))
    }
}

/// Choose the best track for `language`: exact code before a matching primary
/// subtag (`en` vs `en-GB`), and uploaded captions before generated ones.
fn pick_track<'a>(tracks: &'a [CaptionTrack], language: &str) -> Option<&'a CaptionTrack> {
    let wanted_base = primary_subtag(language);
    tracks
        .iter()
        .filter_map(|track| {
            let exact = track.language_code.eq_ignore_ascii_case(language);
            if !exact && !primary_subtag(&track.language_code).eq_ignore_ascii_case(wanted_base) {
                return None;
            }
            Some(((!exact, track.is_generated()), track))
        })
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, track)| track)
}

fn primary_subtag(code: &str) -> &str {
    code.split(['-', '_']).next().unwrap_or(code)
}

/// Find the JSON object assigned after `marker` and return it as a slice.
///
/// Braces are counted outside of string literals, so the object may contain
/// `};` inside strings without cutting it short.
fn extract_json_object<'a>(html: &'a str, marker: &str) -> Option<&'a str> {
    let after_marker = html.find(marker)? + marker.len();
    let start = after_marker + html[after_marker..].find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in html.as_bytes()[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&html[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Flatten a timed-text XML document into plain text.
fn parse_caption_xml(xml: &str) -> ProviderResult<String> {
    let mut found_node = false;
    let mut pieces = Vec::new();

    for caps in CAPTION_NODE.captures_iter(xml) {
        found_node = true;
        let text = decode_entities(&INNER_TAG.replace_all(&caps[1], " "));
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            pieces.push(text);
        }
    }

    if !found_node {
        return Err(TranscriptProviderError::Other(
            "caption payload contained no caption lines".to_string(),
        ));
    }
    Ok(pieces.join(" "))
}

fn decode_entities(text: &str) -> String {
    // Captions are frequently double-escaped ("&amp;#39;"), so unescape &amp; first
    let text = text.replace("&amp;", "&");
    let text = NUMERIC_ENTITY.replace_all(&text, |caps: &regex::Captures| {
        let radix = if caps[1].is_empty() { 10 } else { 16 };
        u32::from_str_radix(&caps[2], radix)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    text.replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
}
