//! Chatty Client Library
//!
//! Streaming chat-completion client for OpenRouter-compatible endpoints.
//! Builds chat payloads from a conversation, decodes the server-sent event
//! stream incrementally, and keeps a catalog of the models a user can pick.
//!
//! # Features
//!
//! - **Streaming**: Incremental `data:` frame decoding with live token throughput
//! - **Cancellation**: Stop an in-flight reply at any time; partial text is kept
//! - **Attachments**: Images are sent inline as base64 data URIs
//! - **Model Catalog**: Built-in defaults, refreshable from `/models`
//! - **Observability**: Tracing spans, session counters, secret redaction
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use chatty_client::{ChattyClient, Message};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ChattyClient::builder()
//!         .api_key("sk-or-your-api-key")
//!         .build()?;
//!
//!     let conversation = vec![Message::user("Hello!")];
//!     let reply = client.stream().send(&conversation)?.collect_reply().await;
//!
//!     println!("{}", reply.content);
//!     println!("{:.1} tokens/s", client.stream().tokens_per_second());
//!     Ok(())
//! }
//! ```
//!
//! # Streaming Example
//!
//! ```rust,no_run
//! use chatty_client::{ChattyClient, Message, StreamEvent};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ChattyClient::from_env()?;
//!     let mut reply = Message::assistant("");
//!     reply.start_streaming();
//!
//!     let mut events = client.stream().send(&[Message::user("Tell me a story")])?;
//!     while let Some(event) = events.next().await {
//!         if let StreamEvent::Delta { content, .. } = &event {
//!             print!("{content}");
//!         }
//!         reply.apply(&event);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod observability;
pub mod services;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::{ChattyClient, ChattyClientBuilder};
pub use config::ChattyConfig;
pub use errors::{ChattyError, ChattyResult};

// Service re-exports
pub use services::{
    build_payload, CollectedReply, ModelCatalog, ModelsService, PayloadOptions, ProcessorState,
    StreamHandle, StreamProcessor,
};

// Type re-exports
pub use types::chat::{
    ChatChunk, ChatRequest, ChunkChoice, Content, ContentPart, Delta, ImageUrl, Usage,
    WireMessage,
};
pub use types::conversation::{Attachment, Message, MessageStatus, Role, StreamStats};
pub use types::models::{default_catalog, ModelInfo, ModelList};
pub use types::stream::{StreamEvent, StreamOutcome, StreamSummary};

/// Mock implementations for testing.
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
