//! Model types.

use serde::{Deserialize, Serialize};

/// Context length assumed when the provider does not report one.
pub const DEFAULT_CONTEXT_LENGTH: u32 = 4096;

/// Model descriptor as used by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model ID (`provider/model`).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Description.
    pub description: String,

    /// Provider name.
    pub provider: String,

    /// Context length in tokens.
    pub max_tokens: u32,

    /// Prompt cost per token in USD.
    pub cost_per_token: f64,

    /// Whether the model accepts image input.
    pub supports_images: bool,

    /// Whether the model accepts file attachments.
    pub supports_files: bool,
}

impl ModelInfo {
    /// Creates a descriptor with default limits and capabilities.
    pub fn new(id: impl Into<String>, name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            provider: provider.into(),
            max_tokens: DEFAULT_CONTEXT_LENGTH,
            cost_per_token: 0.0,
            supports_images: false,
            supports_files: true,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the context length.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the per-token cost.
    pub fn with_cost_per_token(mut self, cost: f64) -> Self {
        self.cost_per_token = cost;
        self
    }

    /// Marks the model as accepting images.
    pub fn with_images(mut self) -> Self {
        self.supports_images = true;
        self
    }
}

/// Model list response.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelList {
    /// Models. Required: a body without it is not a model list.
    pub data: Vec<ModelEntry>,
}

impl ModelList {
    /// Returns the number of models.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Converts the entries into descriptors.
    pub fn into_models(self) -> Vec<ModelInfo> {
        self.data.into_iter().map(ModelInfo::from).collect()
    }
}

/// One entry of the `/models` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    /// Model ID.
    pub id: String,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Description.
    #[serde(default)]
    pub description: Option<String>,

    /// Owner organization.
    #[serde(default)]
    pub owned_by: Option<String>,

    /// Context window size.
    #[serde(default)]
    pub context_length: Option<u32>,

    /// Pricing.
    #[serde(default)]
    pub pricing: Option<Pricing>,

    /// Supported input modalities.
    #[serde(default)]
    pub modalities: Vec<String>,
}

/// Model pricing.
#[derive(Debug, Clone, Deserialize)]
pub struct Pricing {
    /// Prompt price per token. OpenRouter sends this as a decimal string.
    #[serde(default)]
    pub prompt: Option<Price>,
}

/// A price that may arrive as a JSON string or number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Price {
    /// Numeric price.
    Number(f64),
    /// Decimal string price.
    Text(String),
}

impl Price {
    /// Returns the price as a float, or 0.0 if it does not parse.
    pub fn value(&self) -> f64 {
        match self {
            Price::Number(n) => *n,
            Price::Text(s) => s.trim().parse().unwrap_or(0.0),
        }
    }
}

impl From<ModelEntry> for ModelInfo {
    fn from(entry: ModelEntry) -> Self {
        let supports_images = entry
            .modalities
            .iter()
            .any(|m| m == "vision" || m == "image");

        ModelInfo {
            name: entry.name.unwrap_or_else(|| entry.id.clone()),
            description: entry.description.unwrap_or_default(),
            provider: entry
                .owned_by
                .or_else(|| entry.id.split_once('/').map(|(owner, _)| owner.to_string()))
                .unwrap_or_default(),
            max_tokens: entry.context_length.unwrap_or(DEFAULT_CONTEXT_LENGTH),
            cost_per_token: entry
                .pricing
                .and_then(|p| p.prompt)
                .map(|p| p.value())
                .unwrap_or(0.0),
            supports_images,
            supports_files: true,
            id: entry.id,
        }
    }
}

/// Well-known model IDs.
pub mod known {
    /// GPT-4.
    pub const GPT_4: &str = "openai/gpt-4";

    /// GPT-3.5 Turbo.
    pub const GPT_3_5_TURBO: &str = "openai/gpt-3.5-turbo";

    /// Claude 2.
    pub const CLAUDE_2: &str = "anthropic/claude-2";

    /// Claude Instant.
    pub const CLAUDE_INSTANT: &str = "anthropic/claude-instant-v1";

    /// Llama 2 70B chat.
    pub const LLAMA_2_70B: &str = "meta-llama/llama-2-70b-chat";

    /// PaLM 2 chat.
    pub const PALM_2_CHAT: &str = "google/palm-2-chat-bison";

    /// Cohere Command.
    pub const COHERE_COMMAND: &str = "cohere/command";
}

/// Catalog used until the first successful refresh.
pub fn default_catalog() -> Vec<ModelInfo> {
    vec![
        ModelInfo::new(known::GPT_4, "GPT-4", "OpenAI")
            .with_max_tokens(8192)
            .with_cost_per_token(0.00003)
            .with_images(),
        ModelInfo::new(known::GPT_3_5_TURBO, "GPT-3.5 Turbo", "OpenAI")
            .with_cost_per_token(0.000002),
        ModelInfo::new(known::CLAUDE_2, "Claude 2", "Anthropic")
            .with_max_tokens(100000)
            .with_cost_per_token(0.000008),
        ModelInfo::new(known::CLAUDE_INSTANT, "Claude Instant", "Anthropic")
            .with_max_tokens(100000)
            .with_cost_per_token(0.000008),
        ModelInfo::new(known::LLAMA_2_70B, "Llama 2 70B", "Meta"),
        ModelInfo::new(known::PALM_2_CHAT, "PaLM 2 Chat", "Google"),
        ModelInfo::new(known::COHERE_COMMAND, "Cohere Command", "Cohere"),
    ]
}
