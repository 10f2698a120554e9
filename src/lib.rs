//! Recap - summaries of the YouTube video you are watching
//!
//! Recap looks at the active browser tab, resolves the YouTube video in it,
//! fetches the video's metadata and transcript, and asks an AI backend for a
//! summary. Follow-up questions are answered from the same transcript without
//! fetching anything again.
//!
//! # Architecture
//!
//! - `browser` - Tab sources (a browser bridge command, or a fixed URL)
//! - `video` - Video references, validation and metadata
//! - `transcript` - Caption lookup with language fallback
//! - `summary` - AI backends, summaries and follow-up answers
//! - `pipeline` - Run sequencing, cancellation and observable state
//! - `config` - Settings and prompt templates
//!
//! # Example
//!
//! ```rust,no_run
//! use recap::config::Settings;
//! use recap::pipeline::{PipelineController, PipelineStage};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut controller =
//!         PipelineController::from_settings(&settings, Some("https://youtu.be/dQw4w9WgXcQ"))?;
//!
//!     controller.activate().wait().await;
//!
//!     let state = controller.snapshot();
//!     if state.stage == PipelineStage::Ready {
//!         println!("{}", state.summary.unwrap_or_default());
//!         println!("{}", controller.follow_up("What are the key takeaways?").await?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod pipeline;
pub mod summary;
pub mod transcript;
pub mod video;

pub use error::{RecapError, Result};
