//! Active tab to video reference resolution.

use super::{extract_video_id, is_valid_video_id, is_valid_video_url, VideoReference};
use crate::browser::Tab;
use crate::error::{RecapError, Result};
use url::Url;

const WATCH_PREFIXES: &[&str] = &[
    "https://www.youtube.com/watch",
    "https://youtube.com/watch",
    "https://m.youtube.com/watch",
    "http://www.youtube.com/watch",
    "http://youtube.com/watch",
    "http://m.youtube.com/watch",
];

/// Whether `url` points at a YouTube watch page.
pub fn is_watch_url(url: &str) -> bool {
    let url = url.trim();
    WATCH_PREFIXES.iter().any(|prefix| url.starts_with(prefix))
}

/// Pick the active tab and turn it into a video reference.
///
/// Fails with [`RecapError::NoActiveVideoTab`] when no tab is active, and with
/// [`RecapError::InvalidVideoReference`] when the active tab is not a watch
/// page or its identifier does not validate as a URL or as a bare id.
pub fn resolve_active_video(tabs: &[Tab]) -> Result<VideoReference> {
    let tab = tabs
        .iter()
        .find(|tab| tab.active)
        .ok_or(RecapError::NoActiveVideoTab)?;

    if !is_watch_url(&tab.url) {
        return Err(RecapError::InvalidVideoReference(format!(
            "{} is not a YouTube video page",
            tab.url
        )));
    }

    let bare_id = watch_param(&tab.url).unwrap_or_default();
    if !is_valid_video_url(&tab.url) && !is_valid_video_id(&bare_id) {
        return Err(RecapError::InvalidVideoReference(format!(
            "could not find a video identifier in {}",
            tab.url
        )));
    }

    let id = extract_video_id(&tab.url).unwrap_or(bare_id);
    Ok(VideoReference::from_valid_id(&id))
}

fn watch_param(url: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()?
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_active_tab() {
        let tabs = vec![
            Tab::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ", false),
            Tab::new("https://example.com", false),
        ];
        assert!(matches!(
            resolve_active_video(&tabs),
            Err(RecapError::NoActiveVideoTab)
        ));
        assert!(matches!(
            resolve_active_video(&[]),
            Err(RecapError::NoActiveVideoTab)
        ));
    }

    #[test]
    fn test_active_tab_not_a_watch_page() {
        let tabs = vec![
            Tab::new("https://www.youtube.com/watch?v=dQw4w9WgXcQ", false),
            Tab::new("https://www.youtube.com/feed/trending", true),
        ];
        assert!(matches!(
            resolve_active_video(&tabs),
            Err(RecapError::InvalidVideoReference(_))
        ));

        let tabs = vec![Tab::new("https://docs.rs", true)];
        assert!(matches!(
            resolve_active_video(&tabs),
            Err(RecapError::InvalidVideoReference(_))
        ));
    }

    #[test]
    fn test_watch_page_without_valid_id() {
        let tabs = vec![Tab::new("https://www.youtube.com/watch?v=", true)];
        assert!(matches!(
            resolve_active_video(&tabs),
            Err(RecapError::InvalidVideoReference(_))
        ));

        let tabs = vec![Tab::new("https://www.youtube.com/watch?v=%24%24%24", true)];
        assert!(matches!(
            resolve_active_video(&tabs),
            Err(RecapError::InvalidVideoReference(_))
        ));
    }

    #[test]
    fn test_picks_the_active_tab() {
        let tabs = vec![
            Tab::new("https://www.youtube.com/watch?v=aaaaaaaaaaa", false),
            Tab::new("https://www.youtube.com/watch?v=abc123&t=10s", true),
        ];
        let video = resolve_active_video(&tabs).unwrap();
        assert_eq!(video.id(), "abc123");
        assert_eq!(video.watch_url(), "https://www.youtube.com/watch?v=abc123");
    }
}
