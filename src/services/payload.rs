//! Request payload construction.

use crate::config::{ChattyConfig, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::types::chat::{ChatRequest, Content, ContentPart, WireMessage};
use crate::types::conversation::Message;

/// Sampling parameters applied to every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayloadOptions {
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token limit.
    pub max_tokens: u32,
}

impl Default for PayloadOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl From<&ChattyConfig> for PayloadOptions {
    fn from(config: &ChattyConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Builds the streaming request body for a conversation.
///
/// Messages keep their order. A message with attachments is sent as a parts
/// array: its text first (when non-empty), then one image part per non-empty
/// image attachment. Other attachments are not sent.
pub fn build_payload(conversation: &[Message], model: &str, options: &PayloadOptions) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        stream: true,
        temperature: options.temperature,
        max_tokens: options.max_tokens,
        messages: conversation.iter().map(wire_message).collect(),
    }
}

fn wire_message(message: &Message) -> WireMessage {
    let content = if message.has_attachments() {
        let mut parts = Vec::with_capacity(message.attachments.len() + 1);

        if !message.content.is_empty() {
            parts.push(ContentPart::text(message.content.clone()));
        }

        parts.extend(
            message
                .attachments
                .iter()
                .filter(|a| a.is_image && !a.is_empty())
                .map(|a| ContentPart::image_url(a.data_uri())),
        );

        Content::Parts(parts)
    } else {
        Content::Text(message.content.clone())
    };

    WireMessage {
        role: message.role,
        content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::conversation::{Attachment, Role};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_text_only_conversation() {
        let conversation = vec![
            Message::system("Be brief."),
            Message::user("Hi"),
            Message::assistant("Hello!"),
        ];

        let request = build_payload(&conversation, "openai/gpt-4", &PayloadOptions::default());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "openai/gpt-4");
        assert_eq!(value["stream"], true);
        assert_eq!(value["max_tokens"], 2048);
        assert_eq!(
            value["messages"],
            json!([
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "Hi"},
                {"role": "assistant", "content": "Hello!"}
            ])
        );
    }

    #[test]
    fn test_default_temperature() {
        let request = build_payload(&[Message::user("Hi")], "a/b", &PayloadOptions::default());
        assert_eq!(request.temperature, 0.7);
    }

    #[test]
    fn test_options_are_applied() {
        let options = PayloadOptions {
            temperature: 0.25,
            max_tokens: 64,
        };

        let request = build_payload(&[Message::user("Hi")], "a/b", &options);

        assert_eq!(request.temperature, 0.25);
        assert_eq!(request.max_tokens, 64);
    }

    #[test]
    fn test_image_attachment_becomes_parts() {
        let message = Message::user("What is this?")
            .with_attachment(Attachment::new("cat.png", "image/png", b"hello".to_vec()));

        let request = build_payload(&[message], "openai/gpt-4", &PayloadOptions::default());

        assert_eq!(
            serde_json::to_value(&request.messages[0]).unwrap(),
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "What is this?"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,aGVsbG8="}}
                ]
            })
        );
    }

    #[test]
    fn test_empty_text_omits_text_part() {
        let message = Message::user("")
            .with_attachment(Attachment::new("a.jpg", "image/jpeg", vec![1u8, 2, 3]));

        let request = build_payload(&[message], "a/b", &PayloadOptions::default());

        match &request.messages[0].content {
            Content::Parts(parts) => {
                assert_eq!(parts.len(), 1);
                assert!(matches!(parts[0], ContentPart::ImageUrl { .. }));
            }
            other => panic!("Expected parts, got {other:?}"),
        }
    }

    #[test]
    fn test_non_image_and_empty_attachments_are_skipped() {
        let message = Message::user("Read this")
            .with_attachment(Attachment::file("notes.txt", "text/plain", b"notes".to_vec()))
            .with_attachment(Attachment::image("empty.png", "image/png", Vec::<u8>::new()));

        let request = build_payload(&[message], "a/b", &PayloadOptions::default());

        assert_eq!(
            request.messages[0].content,
            Content::Parts(vec![ContentPart::text("Read this")])
        );
    }

    #[test]
    fn test_roles_preserved_in_order() {
        let conversation = vec![
            Message::user("1"),
            Message::assistant("2"),
            Message::user("3"),
        ];

        let request = build_payload(&conversation, "a/b", &PayloadOptions::default());
        let roles: Vec<Role> = request.messages.iter().map(|m| m.role).collect();

        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
    }
}
