//! Chat completion wire types.

use serde::{Deserialize, Serialize};

use super::conversation::Role;

/// Streaming chat completion request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model ID.
    pub model: String,

    /// Always true; the pipeline only issues streaming requests.
    pub stream: bool,

    /// Sampling temperature.
    pub temperature: f32,

    /// Completion token limit.
    pub max_tokens: u32,

    /// Messages in conversation order.
    pub messages: Vec<WireMessage>,
}

/// A single message as sent to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Message role.
    pub role: Role,

    /// Message content.
    pub content: Content,
}

/// Message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text content.
    Text(String),
    /// Multipart content.
    Parts(Vec<ContentPart>),
}

/// Content part for multimodal messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text part.
    Text {
        /// Text content.
        text: String,
    },
    /// Image URL part.
    ImageUrl {
        /// Image URL.
        image_url: ImageUrl,
    },
}

impl ContentPart {
    /// Creates a text part.
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Creates an image part from a URL or data URI.
    pub fn image_url(url: impl Into<String>) -> Self {
        ContentPart::ImageUrl {
            image_url: ImageUrl { url: url.into() },
        }
    }
}

/// Image URL for vision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// Image URL or base64 data URI.
    pub url: String,
}

/// One decoded stream frame.
///
/// Every field is optional on the wire; only the first choice is read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChunk {
    /// Chunk ID.
    #[serde(default)]
    pub id: Option<String>,

    /// Model that produced the chunk.
    #[serde(default)]
    pub model: Option<String>,

    /// Stream choices.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,

    /// Usage, usually only present on the final frame.
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatChunk {
    /// Returns the first choice's delta text, if any and non-empty.
    pub fn delta_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .filter(|text| !text.is_empty())
    }

    /// Returns the authoritative total token count, if reported.
    pub fn total_tokens(&self) -> Option<u64> {
        self.usage.as_ref().and_then(|u| u.total_tokens)
    }
}

/// Stream choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    /// Choice index.
    #[serde(default)]
    pub index: u32,

    /// Incremental delta.
    #[serde(default)]
    pub delta: Delta,

    /// Finish reason, on the last frame of a choice.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental content.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    /// Role, usually only on the first frame.
    #[serde(default)]
    pub role: Option<String>,

    /// Text fragment.
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    /// Prompt tokens.
    #[serde(default)]
    pub prompt_tokens: Option<u64>,

    /// Completion tokens.
    #[serde(default)]
    pub completion_tokens: Option<u64>,

    /// Total tokens.
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "openai/gpt-4".to_string(),
            stream: true,
            temperature: 0.5,
            max_tokens: 2048,
            messages: vec![WireMessage {
                role: Role::User,
                content: Content::Text("Hello".to_string()),
            }],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "openai/gpt-4",
                "stream": true,
                "temperature": 0.5,
                "max_tokens": 2048,
                "messages": [{"role": "user", "content": "Hello"}]
            })
        );
    }

    #[test]
    fn test_parts_serialization() {
        let content = Content::Parts(vec![
            ContentPart::text("Look"),
            ContentPart::image_url("data:image/png;base64,AAAA"),
        ]);

        assert_eq!(
            serde_json::to_value(&content).unwrap(),
            json!([
                {"type": "text", "text": "Look"},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
            ])
        );
    }

    #[test]
    fn test_chunk_parsing() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"id":"gen-1","choices":[{"index":0,"delta":{"role":"assistant","content":"Hi"}}]}"#,
        )
        .unwrap();

        assert_eq!(chunk.delta_content(), Some("Hi"));
        assert_eq!(chunk.total_tokens(), None);
    }

    #[test]
    fn test_chunk_is_lenient() {
        let chunk: ChatChunk = serde_json::from_str("{}").unwrap();
        assert_eq!(chunk.delta_content(), None);

        let chunk: ChatChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap();
        assert_eq!(chunk.delta_content(), None);
    }

    #[test]
    fn test_chunk_usage() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"choices":[],"usage":{"prompt_tokens":5,"completion_tokens":7,"total_tokens":12}}"#,
        )
        .unwrap();

        assert_eq!(chunk.total_tokens(), Some(12));
    }
}
