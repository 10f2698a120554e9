//! Tab listing through an external browser bridge command.

use super::{Tab, TabSource};
use crate::cancel::or_cancelled;
use crate::error::{RecapError, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Runs a shell command that prints the open tabs as JSON.
#[derive(Debug, Clone)]
pub struct CommandTabSource {
    command: Option<String>,
}

impl CommandTabSource {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.filter(|c| !c.trim().is_empty()),
        }
    }

    /// Whether a bridge command is configured at all.
    pub fn is_configured(&self) -> bool {
        self.command.is_some()
    }
}

#[async_trait]
impl TabSource for CommandTabSource {
    #[instrument(skip(self, cancel))]
    async fn list_tabs(&self, cancel: &CancellationToken) -> Result<Vec<Tab>> {
        let command = self.command.as_deref().ok_or_else(|| {
            RecapError::BrowserExtensionUnavailable(
                "no browser.tab_command configured; pass --url or set one in the config file"
                    .to_string(),
            )
        })?;

        debug!("Listing tabs with: {}", command);

        let mut process = shell(command);
        process.kill_on_drop(true);

        let output = or_cancelled(cancel, process.output()).await?.map_err(|e| {
            RecapError::BrowserExtensionUnavailable(format!("failed to run '{}': {}", command, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecapError::BrowserExtensionUnavailable(format!(
                "'{}' failed: {}",
                command,
                stderr.trim()
            )));
        }

        parse_tabs(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_tabs(stdout: &str) -> Result<Vec<Tab>> {
    serde_json::from_str(stdout.trim()).map_err(|e| {
        RecapError::BrowserExtensionUnavailable(format!("unreadable tab list: {}", e))
    })
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
