//! Events reported by a streaming session.

use super::conversation::StreamStats;

/// Event delivered to the caller of a streaming request.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A content-bearing frame arrived.
    Delta {
        /// Text fragment, in arrival order.
        content: String,
        /// Running approximate token count (one per delta).
        token_count: u64,
        /// Running throughput.
        tokens_per_second: f64,
    },
    /// The session ended. Always the last event of a session.
    Finished(StreamSummary),
}

impl StreamEvent {
    /// Returns true if this is the terminal event.
    pub fn is_finished(&self) -> bool {
        matches!(self, StreamEvent::Finished(_))
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    /// The body ended normally.
    Completed,
    /// Transport or HTTP failure.
    Failed {
        /// Failure description.
        message: String,
    },
    /// The caller stopped the request.
    Cancelled,
}

impl StreamOutcome {
    /// Returns true for a successful completion.
    pub fn is_success(&self) -> bool {
        matches!(self, StreamOutcome::Completed)
    }
}

/// Terminal report of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSummary {
    /// How the session ended.
    pub outcome: StreamOutcome,
    /// Final statistics.
    pub stats: StreamStats,
}
