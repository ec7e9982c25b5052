//! Configuration module for the Chatty client.
//!
//! Holds the API key, endpoint, selected model and sampling parameters that
//! the streaming pipeline reads for every request. The API key is optional at
//! construction time; requests made without one fail before anything is sent.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use url::Url;

use crate::errors::{ChattyError, ChattyResult};

/// Default base URL (OpenRouter).
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default completion token limit.
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Default request timeout (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Chatty/1.0.0";

/// Minimum plausible API key length.
const MIN_API_KEY_LEN: usize = 10;

/// Configuration for the Chatty client.
#[derive(Clone)]
pub struct ChattyConfig {
    /// API key for authentication (stored securely).
    pub(crate) api_key: Option<SecretString>,
    /// Base URL for API requests, without trailing slash.
    pub base_url: String,
    /// Model identifier sent with chat requests.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token limit.
    pub max_tokens: u32,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent header value.
    pub user_agent: String,
}

impl ChattyConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ChattyConfigBuilder {
        ChattyConfigBuilder::new()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENROUTER_API_KEY` (optional): API key for authentication
    /// - `OPENROUTER_BASE_URL` (optional): Custom base URL
    /// - `OPENROUTER_MODEL` (optional): Model identifier
    /// - `CHATTY_TIMEOUT` (optional): Request timeout in seconds
    pub fn from_env() -> ChattyResult<Self> {
        let mut builder = ChattyConfigBuilder::new();

        if let Ok(api_key) = std::env::var("OPENROUTER_API_KEY") {
            builder = builder.api_key(api_key);
        }

        if let Ok(base_url) = std::env::var("OPENROUTER_BASE_URL") {
            builder = builder.base_url(base_url);
        }

        if let Ok(model) = std::env::var("OPENROUTER_MODEL") {
            builder = builder.model(model);
        }

        if let Ok(timeout_str) = std::env::var("CHATTY_TIMEOUT") {
            if let Ok(timeout_secs) = timeout_str.parse::<u64>() {
                builder = builder.timeout(Duration::from_secs(timeout_secs));
            }
        }

        builder.build()
    }

    /// Returns the API key if one is configured and non-empty.
    pub(crate) fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret().as_str())
            .filter(|key| !key.is_empty())
    }

    /// Returns true if a non-empty API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Returns the API key hint (last 4 characters) for debugging.
    pub fn api_key_hint(&self) -> String {
        key_hint(self.api_key().unwrap_or_default())
    }

    /// Returns the full URL for an endpoint.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl std::fmt::Debug for ChattyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChattyConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Builder for `ChattyConfig`.
#[derive(Default)]
pub struct ChattyConfigBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ChattyConfigBuilder {
    /// Creates a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the completion token limit.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Some(Duration::from_secs(secs));
        self
    }

    /// Sets the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ChattyResult<ChattyConfig> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let parsed = Url::parse(&base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ChattyError::configuration(format!(
                "Unsupported base URL scheme: {}",
                parsed.scheme()
            )));
        }

        let temperature = self.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ChattyError::configuration(
                "Temperature must be between 0.0 and 2.0",
            ));
        }

        let max_tokens = self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(ChattyError::configuration("max_tokens must be positive"));
        }

        let model = self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model.is_empty() {
            return Err(ChattyError::configuration("Model cannot be empty"));
        }

        if let Some(key) = &self.api_key {
            if !key.is_empty() && !validate_api_key(key) {
                tracing::warn!("API key looks too short to be valid");
            }
        }

        Ok(ChattyConfig {
            api_key: self.api_key.map(SecretString::new),
            base_url,
            model,
            temperature,
            max_tokens,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        })
    }
}

/// Last four characters of a key for debug output, or `****` for short keys.
pub(crate) fn key_hint(key: &str) -> String {
    let mut tail = key.char_indices().rev();
    match (tail.nth(3), tail.next()) {
        (Some((start, _)), Some(_)) => format!("...{}", &key[start..]),
        _ => "****".to_string(),
    }
}

/// Returns true if the key is plausibly an API key (non-empty, not too short).
pub fn validate_api_key(key: &str) -> bool {
    !key.is_empty() && key.len() >= MIN_API_KEY_LEN
}

/// Returns true if the model id has the `provider/model` form.
pub fn validate_model_id(model: &str) -> bool {
    match model.split_once('/') {
        Some((provider, name)) => !provider.is_empty() && !name.is_empty(),
        None => false,
    }
}
