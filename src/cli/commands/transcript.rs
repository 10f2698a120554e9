//! Transcript command: print the transcript of the active video.

use crate::browser::tab_source_from_settings;
use crate::cancel::or_cancelled;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::transcript::{
    LanguagePriority, TranscriptFetcher, TranscriptOutcome, YoutubeCaptionProvider,
};
use crate::video::{resolve_active_video, VideoReference};
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run the transcript command.
pub async fn run_transcript(
    url: Option<&str>,
    language: Option<String>,
    settings: Settings,
) -> Result<()> {
    let operation = Operation::Transcript {
        url_given: url.is_some(),
    };
    if let Err(e) = preflight::check(operation, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'recap doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            watcher.cancel();
        }
    });

    let video = url.map(VideoReference::parse).transpose()?;
    let tabs = tab_source_from_settings(&settings.browser, video.as_ref().map(|v| v.watch_url()));
    let tabs = or_cancelled(&cancel, tabs.list_tabs(&cancel)).await??;
    let video = resolve_active_video(&tabs)?;

    let languages = LanguagePriority::new(
        language.unwrap_or_else(|| settings.transcript.language.clone()),
        settings.transcript.fallback_languages.clone(),
    );
    let fetcher = TranscriptFetcher::new(Arc::new(YoutubeCaptionProvider::new()?));

    match or_cancelled(&cancel, fetcher.fetch(&video, &languages, &cancel)).await?? {
        TranscriptOutcome::Found(transcript) => {
            Output::info(&format!("Transcript of {} ({})", video.watch_url(), transcript.language));
            println!("{}", transcript.text);
        }
        TranscriptOutcome::Unavailable { attempted } => {
            Output::warning(&format!(
                "No transcript available for {} (tried: {})",
                video.watch_url(),
                attempted.join(", ")
            ));
        }
    }

    Ok(())
}
