//! CLI output formatting utilities.

use crate::video::VideoMetadata;
use console::{style, Style};
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print the video card shown above a summary.
    pub fn video_info(metadata: &VideoMetadata) {
        Self::header(&metadata.title);
        match &metadata.channel_url {
            Some(url) => Self::kv("Channel", &format!("{} ({})", metadata.channel_name, url)),
            None => Self::kv("Channel", &metadata.channel_name),
        }
        if let Some(published) = metadata.published {
            Self::kv("Published", &published.format("%Y-%m-%d").to_string());
        }
        if let Some(duration) = &metadata.duration {
            Self::kv("Duration", duration);
        }
        if let Some(views) = metadata.formatted_views() {
            Self::kv("Views", &views);
        }
        Self::kv("URL", &metadata.video_url);
    }

    /// Print a markdown answer block.
    pub fn answer(text: &str) {
        println!();
        for line in text.lines() {
            if line.starts_with('#') {
                println!("{}", Self::title_style().apply_to(line));
            } else {
                println!("{}", line);
            }
        }
        println!();
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) =
            ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
        {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    /// Style for titles.
    pub fn title_style() -> Style {
        Style::new().bold()
    }
}
