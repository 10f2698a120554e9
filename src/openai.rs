//! OpenAI client configuration with sensible defaults.

use crate::error::Result;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for chat completion requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create a client for api.openai.com authenticated with `api_key`.
pub fn create_client(api_key: &str) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(
        OpenAIConfig::new().with_api_key(api_key),
        Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    )
}

/// Create a client for an OpenAI-compatible server that needs no token.
pub fn create_local_client(base_url: &str) -> Result<Client<OpenAIConfig>> {
    create_client_with_timeout(
        OpenAIConfig::new()
            .with_api_base(base_url.trim_end_matches('/'))
            .with_api_key(""),
        Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    )
}

/// Create a client with a custom timeout.
pub fn create_client_with_timeout(
    config: OpenAIConfig,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    Ok(Client::with_config(config).with_http_client(http_client))
}
