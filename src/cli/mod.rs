//! CLI module for Recap.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::config::{BackendKind, Creativity};
use clap::{Parser, Subcommand};

/// Recap - summarize the YouTube video you are watching
///
/// Reads the active browser tab (or a URL you pass), fetches the video's
/// transcript and asks an AI backend for a summary. Follow-up questions reuse
/// the same transcript.
#[derive(Parser, Debug)]
#[command(name = "recap")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize the video in the active browser tab
    Summarize {
        /// Video URL or ID to use instead of the active tab
        #[arg(short, long)]
        url: Option<String>,

        /// AI backend (local, openai, anthropic)
        #[arg(short, long, env = "RECAP_BACKEND")]
        backend: Option<BackendKind>,

        /// Model to use with the selected backend
        #[arg(short, long)]
        model: Option<String>,

        /// Creativity (none, low, medium, high, maximum)
        #[arg(long)]
        creativity: Option<Creativity>,

        /// Language to write the summary in (default: the transcript's)
        #[arg(short, long)]
        language: Option<String>,

        /// Exit after printing the summary
        #[arg(long)]
        no_follow_up: bool,
    },

    /// Print the transcript of the video in the active browser tab
    Transcript {
        /// Video URL or ID to use instead of the active tab
        #[arg(short, long)]
        url: Option<String>,

        /// Preferred caption language (falls back to the configured languages)
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "backend.kind")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_summarize_flags() {
        let cli = Cli::try_parse_from([
            "recap",
            "-vv",
            "summarize",
            "--url",
            "https://youtu.be/dQw4w9WgXcQ",
            "--backend",
            "claude",
            "--creativity",
            "high",
            "--no-follow-up",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Summarize {
                url,
                backend,
                creativity,
                no_follow_up,
                ..
            } => {
                assert_eq!(url.as_deref(), Some("https://youtu.be/dQw4w9WgXcQ"));
                assert_eq!(backend, Some(BackendKind::Anthropic));
                assert_eq!(creativity, Some(Creativity::High));
                assert!(no_follow_up);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_backend() {
        assert!(Cli::try_parse_from(["recap", "summarize", "--backend", "gemini"]).is_err());
    }
}
