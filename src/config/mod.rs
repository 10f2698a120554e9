//! Configuration module for Recap.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{FollowUpPrompts, Prompts, SummaryPrompts};
pub use settings::{
    AnthropicSettings, BackendKind, BackendSettings, BrowserSettings, Creativity,
    GeneralSettings, LocalSettings, OpenAiSettings, PromptSettings, Settings, SummarySettings,
    TranscriptSettings,
};
