//! Prompt templates for Recap.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub summary: SummaryPrompts,
    pub follow_up: FollowUpPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for the initial video summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryPrompts {
    pub system: String,
    pub user: String,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            system: r#"You summarize YouTube videos from their transcripts.

Guidelines:
- Capture the main argument, the key points and any conclusions
- Keep the order in which the video presents its ideas
- Skip sponsor reads, subscription requests, intros and outros
- Never invent content that is not in the transcript
- Format the answer as Markdown with short headings and bullet points
- Do not include images, links to media or embedded content"#
                .to_string(),

            user: r#"Summarize the video "{{title}}".

Write the summary in {{language}}.

Transcript:
{{transcript}}"#
                .to_string(),
        }
    }
}

/// Prompts for follow-up questions about an already summarized video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowUpPrompts {
    pub system: String,
    pub user: String,
}

impl Default for FollowUpPrompts {
    fn default() -> Self {
        Self {
            system: r#"You answer questions about a YouTube video using its transcript.

Guidelines:
- Answer only from the transcript and your previous answer
- If the transcript does not cover the question, say so plainly
- Format the answer as Markdown
- Do not include images, links to media or embedded content"#
                .to_string(),

            user: r#"Video: "{{title}}"

Transcript:
{{transcript}}

Your previous answer:
{{previous_answer}}

Question: {{question}}

Answer in {{language}}."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let summary_path = custom_path.join("summary.toml");
            if summary_path.exists() {
                let content = std::fs::read_to_string(&summary_path)?;
                prompts.summary = toml::from_str(&content)?;
            }

            let follow_up_path = custom_path.join("follow_up.toml");
            if follow_up_path.exists() {
                let content = std::fs::read_to_string(&follow_up_path)?;
                prompts.follow_up = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
