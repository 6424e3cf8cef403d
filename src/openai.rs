//! OpenAI client construction from explicit settings.

use crate::config::OpenAISettings;
use crate::error::{PlotlineError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create an OpenAI client from settings.
///
/// The API key must already be resolved; this never falls back to the
/// process environment.
pub fn create_client(settings: &OpenAISettings) -> Result<Client<OpenAIConfig>> {
    let api_key = settings
        .api_key
        .as_deref()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            PlotlineError::Config(
                "OPENAI_API_KEY not set. Set it in your environment or .env file".to_string(),
            )
        })?;

    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base_url) = settings.base_url.as_deref() {
        config = config.with_api_base(base_url);
    }

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()?;

    Ok(Client::with_config(config).with_http_client(http_client))
}
