//! Type definitions for the Chatty client.
//!
//! Conversation model, model descriptors, stream events, and the wire types
//! exchanged with OpenRouter-compatible endpoints.

pub mod chat;
pub mod conversation;
pub mod models;
pub mod stream;
