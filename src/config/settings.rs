//! Configuration settings for Recap.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub browser: BrowserSettings,
    pub transcript: TranscriptSettings,
    pub summary: SummarySettings,
    pub backend: BackendSettings,
    pub local: LocalSettings,
    pub openai: OpenAiSettings,
    pub anthropic: AnthropicSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// Browser integration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct BrowserSettings {
    /// Shell command that prints the open tabs as a JSON array of
    /// `{"url": "...", "active": true}` objects.
    pub tab_command: Option<String>,
}

/// Transcript language settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Preferred caption language (BCP-47 code, e.g. "en", "de", "pt-BR").
    pub language: String,
    /// Languages to try, in order, when the preferred one has no captions.
    pub fallback_languages: Vec<String>,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            fallback_languages: vec!["en".to_string()],
        }
    }
}

/// Summary generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    /// Language the summary is written in. None = the transcript's language.
    pub language: Option<String>,
    /// Transcripts longer than this (in characters) are truncated before prompting.
    pub max_transcript_chars: usize,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            language: None,
            max_transcript_chars: 120_000,
        }
    }
}

/// The AI backend used for summaries and follow-up answers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local OpenAI-compatible assistant endpoint (no API token).
    #[default]
    Local,
    /// OpenAI chat completions (API token required).
    OpenAi,
    /// Anthropic messages API (API token required).
    Anthropic,
}

impl BackendKind {
    /// Whether the backend needs a user-supplied API token.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, BackendKind::Local)
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "assistant" => Ok(BackendKind::Local),
            "openai" | "chatgpt" => Ok(BackendKind::OpenAi),
            "anthropic" | "claude" => Ok(BackendKind::Anthropic),
            _ => Err(format!("Unknown backend: {}", s)),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Local => write!(f, "local"),
            BackendKind::OpenAi => write!(f, "openai"),
            BackendKind::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// How freely the model may phrase its answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Creativity {
    None,
    #[default]
    Low,
    Medium,
    High,
    Maximum,
}

impl Creativity {
    /// Sampling temperature for this creativity level.
    pub fn temperature(&self) -> f32 {
        match self {
            Creativity::None => 0.0,
            Creativity::Low => 0.4,
            Creativity::Medium => 0.7,
            Creativity::High => 1.0,
            Creativity::Maximum => 1.5,
        }
    }
}

impl std::str::FromStr for Creativity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Creativity::None),
            "low" => Ok(Creativity::Low),
            "medium" => Ok(Creativity::Medium),
            "high" => Ok(Creativity::High),
            "maximum" | "max" => Ok(Creativity::Maximum),
            _ => Err(format!("Unknown creativity level: {}", s)),
        }
    }
}

impl std::fmt::Display for Creativity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Creativity::None => "none",
            Creativity::Low => "low",
            Creativity::Medium => "medium",
            Creativity::High => "high",
            Creativity::Maximum => "maximum",
        };
        write!(f, "{}", name)
    }
}

/// Backend selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct BackendSettings {
    /// Backend to use (local, openai, anthropic).
    pub kind: BackendKind,
    /// Creativity level (none, low, medium, high, maximum).
    pub creativity: Creativity,
}

/// Local assistant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSettings {
    /// Base URL of the OpenAI-compatible endpoint.
    pub base_url: String,
    /// Model identifier served by the endpoint.
    pub model: String,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234/v1".to_string(),
            model: "local-model".to_string(),
        }
    }
}

/// OpenAI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    /// API token (falls back to OPENAI_API_KEY).
    pub api_key: Option<String>,
    /// Chat model.
    pub model: String,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Anthropic settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicSettings {
    /// API token (falls back to ANTHROPIC_API_KEY).
    pub api_key: Option<String>,
    /// Messages model.
    pub model: String,
    /// Maximum tokens in a response.
    pub max_tokens: u32,
    /// API base URL.
    pub base_url: String,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "claude-3-5-haiku-latest".to_string(),
            max_tokens: 4096,
            base_url: "https://api.anthropic.com".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::RecapError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("recap")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// OpenAI token from config, or OPENAI_API_KEY.
    pub fn openai_api_key(&self) -> Option<String> {
        non_empty(self.openai.api_key.clone()).or_else(|| env_key("OPENAI_API_KEY"))
    }

    /// Anthropic token from config, or ANTHROPIC_API_KEY.
    pub fn anthropic_api_key(&self) -> Option<String> {
        non_empty(self.anthropic.api_key.clone()).or_else(|| env_key("ANTHROPIC_API_KEY"))
    }

    /// Model identifier of the selected backend.
    pub fn backend_model(&self) -> &str {
        match self.backend.kind {
            BackendKind::Local => &self.local.model,
            BackendKind::OpenAi => &self.openai.model,
            BackendKind::Anthropic => &self.anthropic.model,
        }
    }

    /// Override the model of the selected backend.
    pub fn set_backend_model(&mut self, model: &str) {
        let target = match self.backend.kind {
            BackendKind::Local => &mut self.local.model,
            BackendKind::OpenAi => &mut self.openai.model,
            BackendKind::Anthropic => &mut self.anthropic.model,
        };
        *target = model.to_string();
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn env_key(name: &str) -> Option<String> {
    non_empty(std::env::var(name).ok())
}
