//! Chatty client.
//!
//! Provides the main client interface: the streaming processor and the model
//! catalog, wired to a shared transport and credentials.

use std::sync::Arc;

use crate::auth::{ApiKeyAuth, AuthProvider};
use crate::config::{ChattyConfig, ChattyConfigBuilder};
use crate::errors::{ChattyError, ChattyResult};
use crate::observability::LogConfig;
use crate::services::{ModelCatalog, ModelsService, PayloadOptions, StreamProcessor};
use crate::transport::{HttpTransport, HttpTransportImpl};

/// The main Chatty client.
///
/// # Example
///
/// ```rust,no_run
/// use chatty_client::{ChattyClient, Message, StreamEvent};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = ChattyClient::builder()
///         .api_key("sk-or-your-api-key")
///         .model("openai/gpt-4")
///         .build()?;
///
///     let mut handle = client.stream().send(&[Message::user("Hello!")])?;
///     while let Some(event) = handle.recv().await {
///         if let StreamEvent::Delta { content, .. } = event {
///             print!("{content}");
///         }
///     }
///     Ok(())
/// }
/// ```
pub struct ChattyClient {
    config: ChattyConfig,
    stream_processor: StreamProcessor,
    models_service: ModelsService,
    catalog: ModelCatalog,
}

impl ChattyClient {
    /// Creates a new client builder.
    pub fn builder() -> ChattyClientBuilder {
        ChattyClientBuilder::new()
    }

    /// Creates a client from environment variables.
    ///
    /// See [`ChattyConfig::from_env`] for the variables read.
    pub fn from_env() -> ChattyResult<Self> {
        let config = ChattyConfig::from_env()?;
        ChattyClientBuilder::from_config(config).build()
    }

    /// Returns the stream processor.
    pub fn stream(&self) -> &StreamProcessor {
        &self.stream_processor
    }

    /// Returns the models service.
    pub fn models(&self) -> &ModelsService {
        &self.models_service
    }

    /// Changes the model used by subsequent requests.
    pub fn select_model(&self, model: impl Into<String>) {
        let model = model.into();
        if !crate::config::validate_model_id(&model) {
            tracing::warn!(model = %model, "Model id is not in provider/model form");
        }
        self.catalog.select(model);
    }

    /// Returns the selected model id.
    pub fn selected_model(&self) -> String {
        self.catalog.selected()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ChattyConfig {
        &self.config
    }
}

impl std::fmt::Debug for ChattyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChattyClient")
            .field("config", &self.config)
            .field("selected_model", &self.catalog.selected())
            .finish()
    }
}

/// Builder for the Chatty client.
pub struct ChattyClientBuilder {
    config_builder: ChattyConfigBuilder,
    config: Option<ChattyConfig>,
    transport: Option<Arc<dyn HttpTransport>>,
    auth: Option<Arc<dyn AuthProvider>>,
    log_config: LogConfig,
    stream_timeout: Option<std::time::Duration>,
}

impl ChattyClientBuilder {
    /// Creates a new client builder.
    pub fn new() -> Self {
        Self {
            config_builder: ChattyConfigBuilder::new(),
            config: None,
            transport: None,
            auth: None,
            log_config: LogConfig::default(),
            stream_timeout: None,
        }
    }

    /// Creates a builder from an existing configuration.
    ///
    /// Settings applied through the builder's config setters are ignored
    /// when a full configuration is supplied.
    pub fn from_config(config: ChattyConfig) -> Self {
        Self {
            config: Some(config),
            ..Self::new()
        }
    }

    /// Sets the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.api_key(api_key);
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(base_url);
        self
    }

    /// Sets the model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.model(model);
        self
    }

    /// Sets the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config_builder = self.config_builder.temperature(temperature);
        self
    }

    /// Sets the completion token limit.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config_builder = self.config_builder.max_tokens(max_tokens);
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Bounds each streamed reply, body included. Unbounded by default.
    pub fn stream_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.stream_timeout = Some(timeout);
        self
    }

    /// Sets a custom transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets a custom auth provider.
    pub fn auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Sets the log configuration.
    pub fn log_config(mut self, config: LogConfig) -> Self {
        self.log_config = config;
        self
    }

    /// Builds the client.
    pub fn build(self) -> ChattyResult<ChattyClient> {
        let config = match self.config {
            Some(config) => config,
            None => self.config_builder.build()?,
        };

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(t) => t,
            None => Arc::new(
                HttpTransportImpl::new(&config.base_url, config.timeout, &config.user_agent)
                    .map_err(|e| ChattyError::configuration(e.to_string()))?,
            ),
        };

        let auth: Arc<dyn AuthProvider> = match self.auth {
            Some(a) => a,
            None => Arc::new(ApiKeyAuth::from_string(
                config.api_key().unwrap_or_default(),
            )),
        };

        let catalog = ModelCatalog::with_defaults(config.model.clone());

        let mut stream_processor = StreamProcessor::new(
            Arc::clone(&transport),
            Arc::clone(&auth),
            catalog.clone(),
            PayloadOptions::from(&config),
        )
        .with_log_config(self.log_config);
        if let Some(timeout) = self.stream_timeout {
            stream_processor = stream_processor.with_timeout(timeout);
        }

        let models_service = ModelsService::new(transport, auth, catalog.clone());

        tracing::debug!(
            base_url = %config.base_url,
            model = %config.model,
            has_api_key = config.has_api_key(),
            "Chatty client initialized"
        );

        Ok(ChattyClient {
            config,
            stream_processor,
            models_service,
            catalog,
        })
    }
}

impl Default for ChattyClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
