//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting a run that would otherwise fail midway.

use crate::config::{BackendKind, Settings};
use crate::error::{RecapError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Summaries need yt-dlp for metadata and a usable backend.
    Summarize,
    /// Printing a transcript needs a way to find the video: either an
    /// explicit URL or a configured tab command.
    Transcript { url_given: bool },
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Summarize => {
            check_backend(settings)?;
            check_tool("yt-dlp")?;
        }
        Operation::Transcript { url_given } => {
            if !url_given {
                check_tab_source(settings)?;
            }
        }
    }
    Ok(())
}

/// Check that the active tab can be discovered without an explicit URL.
fn check_tab_source(settings: &Settings) -> Result<()> {
    match settings.browser.tab_command.as_deref().map(str::trim) {
        Some(command) if !command.is_empty() => Ok(()),
        _ => Err(RecapError::BrowserExtensionUnavailable(
            "no browser.tab_command configured; pass --url or set one with: \
             recap config set browser.tab_command '...'"
                .to_string(),
        )),
    }
}

/// Check that the selected backend has the token it needs.
fn check_backend(settings: &Settings) -> Result<()> {
    let kind = settings.backend.kind;
    if !kind.requires_api_key() {
        return Ok(());
    }
    let (key, env) = match kind {
        BackendKind::Anthropic => (settings.anthropic_api_key(), "ANTHROPIC_API_KEY"),
        _ => (settings.openai_api_key(), "OPENAI_API_KEY"),
    };

    match key {
        Some(_) => Ok(()),
        None => Err(RecapError::Config(format!(
            "{} backend needs an API key. Set it with: export {}='...' \
             (or recap config set {}.api_key ...)",
            kind, env, kind
        ))),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(RecapError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(RecapError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(RecapError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
