//! Browser tab inspection.
//!
//! The pipeline only needs the list of open tabs with their URL and whether
//! the tab is the focused one. Where that list comes from is up to the host.

mod command;

pub use command::CommandTabSource;

use crate::config::BrowserSettings;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One open browser tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    /// URL loaded in the tab.
    pub url: String,
    /// Whether this is the focused tab.
    #[serde(default)]
    pub active: bool,
}

impl Tab {
    pub fn new(url: impl Into<String>, active: bool) -> Self {
        Self {
            url: url.into(),
            active,
        }
    }
}

/// Trait for anything that can list the browser's open tabs.
#[async_trait]
pub trait TabSource: Send + Sync {
    /// List the open tabs in browser order.
    async fn list_tabs(&self, cancel: &CancellationToken) -> Result<Vec<Tab>>;
}

/// A fixed set of tabs, used when the video URL is given directly.
#[derive(Debug, Clone, Default)]
pub struct StaticTabSource {
    tabs: Vec<Tab>,
}

impl StaticTabSource {
    pub fn new(tabs: Vec<Tab>) -> Self {
        Self { tabs }
    }

    /// A single active tab showing `url`.
    pub fn single(url: impl Into<String>) -> Self {
        Self::new(vec![Tab::new(url, true)])
    }
}

#[async_trait]
impl TabSource for StaticTabSource {
    async fn list_tabs(&self, _cancel: &CancellationToken) -> Result<Vec<Tab>> {
        Ok(self.tabs.clone())
    }
}

/// Pick the tab source: an explicit URL wins over the configured browser bridge.
pub fn tab_source_from_settings(
    settings: &BrowserSettings,
    url_override: Option<&str>,
) -> Arc<dyn TabSource> {
    match url_override {
        Some(url) => Arc::new(StaticTabSource::single(url)),
        None => Arc::new(CommandTabSource::new(settings.tab_command.clone())),
    }
}
