//! Observability module for the Chatty client.
//!
//! Subscriber setup for `tracing`, secret redaction for logged text, and
//! counters for streaming sessions.

mod logging;
mod metrics;

pub use logging::{init_tracing, redact, LogConfig, LogFormat, LogLevel};
pub use metrics::{MetricsSnapshot, SessionMetrics};
