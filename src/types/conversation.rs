//! Conversation data model.
//!
//! Messages, their attachments and the statistics gathered while an assistant
//! reply streams in. A message being streamed is driven by [`Message::apply`],
//! which folds [`StreamEvent`]s into content, status and stats.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stream::{StreamEvent, StreamOutcome};

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message.
    User,
    /// Assistant message.
    Assistant,
    /// System message.
    System,
}

impl Role {
    /// Returns the wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Queued locally, not yet sent.
    Sending,
    /// Reply text is arriving.
    Streaming,
    /// Finished.
    Complete,
    /// Failed.
    Error,
}

impl MessageStatus {
    /// Returns true once the message can no longer change.
    pub fn is_final(&self) -> bool {
        matches!(self, MessageStatus::Complete | MessageStatus::Error)
    }
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// File name.
    pub filename: String,
    /// MIME type.
    pub mime_type: String,
    /// Raw content.
    pub data: Bytes,
    /// Whether the attachment is sent as an image part.
    pub is_image: bool,
}

impl Attachment {
    /// Creates an attachment, marking it as an image when the MIME type is `image/*`.
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let mime_type = mime_type.into();
        let is_image = mime_type
            .parse::<mime::Mime>()
            .map(|m| m.type_() == mime::IMAGE)
            .unwrap_or(false);

        Self {
            filename: filename.into(),
            mime_type,
            data: data.into(),
            is_image,
        }
    }

    /// Creates an image attachment regardless of the MIME type.
    pub fn image(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            is_image: true,
            ..Self::new(filename, mime_type, data)
        }
    }

    /// Creates a non-image attachment.
    pub fn file(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            is_image: false,
            ..Self::new(filename, mime_type, data)
        }
    }

    /// Returns true if the attachment has no content.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Encodes the content as a `data:` URI.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

/// Statistics of a streamed reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamStats {
    /// Approximate token count, one per content-bearing frame.
    pub token_count: u64,
    /// Tokens per second since the request started.
    pub tokens_per_second: f64,
    /// Authoritative total reported by the provider, if any.
    pub total_tokens: Option<u64>,
    /// When the request started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the session ended.
    pub ended_at: Option<DateTime<Utc>>,
}

impl StreamStats {
    /// Creates stats for a session starting now.
    pub fn started_now() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Returns the session duration, once ended.
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// A chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Unique ID (`msg_<uuid>`).
    pub id: String,
    /// Role.
    pub role: Role,
    /// Text content.
    pub content: String,
    /// Attachments.
    pub attachments: Vec<Attachment>,
    /// Lifecycle status.
    pub status: MessageStatus,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Streaming statistics, for assistant replies.
    pub stats: StreamStats,
}

impl Message {
    /// Creates a completed message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
            role,
            content: content.into(),
            attachments: Vec::new(),
            status: MessageStatus::Complete,
            timestamp: Utc::now(),
            stats: StreamStats::default(),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Adds an attachment.
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Returns true if any attachment is present.
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// Marks the message as streaming and resets its statistics.
    pub fn start_streaming(&mut self) {
        self.status = MessageStatus::Streaming;
        self.stats = StreamStats::started_now();
    }

    /// Folds a stream event into the message.
    ///
    /// Returns false, leaving the message untouched, once it is `Complete` or
    /// `Error`. A cancelled session completes the message with whatever text
    /// had arrived.
    pub fn apply(&mut self, event: &StreamEvent) -> bool {
        if self.status.is_final() {
            return false;
        }

        match event {
            StreamEvent::Delta {
                content,
                token_count,
                tokens_per_second,
            } => {
                self.status = MessageStatus::Streaming;
                self.content.push_str(content);
                self.stats.token_count = *token_count;
                self.stats.tokens_per_second = *tokens_per_second;
            }
            StreamEvent::Finished(summary) => {
                let started_at = self.stats.started_at;
                self.stats = summary.stats.clone();
                if self.stats.started_at.is_none() {
                    self.stats.started_at = started_at;
                }
                if self.stats.ended_at.is_none() {
                    self.stats.ended_at = Some(Utc::now());
                }

                self.status = match summary.outcome {
                    StreamOutcome::Completed | StreamOutcome::Cancelled => MessageStatus::Complete,
                    StreamOutcome::Failed { .. } => MessageStatus::Error,
                };
            }
        }

        true
    }
}
