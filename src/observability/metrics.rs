//! Session metrics for the streaming pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::stream::StreamOutcome;

/// Counters for streaming sessions.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    deltas: AtomicU64,
    frames_skipped: AtomicU64,
}

/// Point-in-time copy of [`SessionMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Sessions started.
    pub sessions_started: u64,
    /// Sessions that completed.
    pub sessions_completed: u64,
    /// Sessions that failed.
    pub sessions_failed: u64,
    /// Sessions stopped by the caller.
    pub sessions_cancelled: u64,
    /// Delta events emitted.
    pub deltas_emitted: u64,
    /// Malformed frames skipped.
    pub frames_skipped: u64,
}

impl MetricsSnapshot {
    /// Sessions that have reached a terminal outcome.
    pub fn sessions_finished(&self) -> u64 {
        self.sessions_completed + self.sessions_failed + self.sessions_cancelled
    }

    /// Percentage of finished sessions that completed.
    pub fn success_rate(&self) -> f64 {
        let finished = self.sessions_finished();
        if finished == 0 {
            100.0
        } else {
            (self.sessions_completed as f64 / finished as f64) * 100.0
        }
    }
}

impl SessionMetrics {
    /// Creates a new collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a session start.
    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a terminal outcome.
    pub fn record_outcome(&self, outcome: &StreamOutcome) {
        let counter = match outcome {
            StreamOutcome::Completed => &self.completed,
            StreamOutcome::Failed { .. } => &self.failed,
            StreamOutcome::Cancelled => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an emitted delta.
    pub fn record_delta(&self) {
        self.deltas.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a skipped frame.
    pub fn record_frame_skipped(&self) {
        self.frames_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the current values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_started: self.started.load(Ordering::Relaxed),
            sessions_completed: self.completed.load(Ordering::Relaxed),
            sessions_failed: self.failed.load(Ordering::Relaxed),
            sessions_cancelled: self.cancelled.load(Ordering::Relaxed),
            deltas_emitted: self.deltas.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters.
    pub fn reset(&self) {
        for counter in [
            &self.started,
            &self.completed,
            &self.failed,
            &self.cancelled,
            &self.deltas,
            &self.frames_skipped,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
