//! Stream processor.
//!
//! Owns at most one in-flight chat request. [`StreamProcessor::send`] builds
//! the payload, spawns the request on the tokio runtime and returns a
//! [`StreamHandle`] that yields [`StreamEvent`]s: one `Delta` per
//! content-bearing frame, then exactly one `Finished`.
//!
//! Framing state (line buffer, counters) lives in a per-session value owned by
//! the spawned task. The processor itself only tracks whether a session is
//! active, the cancellation token of that session, and the statistics of the
//! last finished one.

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, instrument, warn, Instrument};

use super::models::ModelCatalog;
use super::payload::{build_payload, PayloadOptions};
use crate::auth::AuthProvider;
use crate::errors::{status_message, ChattyError, ChattyResult};
use crate::observability::{LogConfig, MetricsSnapshot, SessionMetrics};
use crate::transport::{parse_line, ByteStream, HttpRequest, HttpTransport, LineBuffer, SseLine};
use crate::types::conversation::{Message, StreamStats};

pub use crate::types::stream::{StreamEvent, StreamOutcome, StreamSummary};

/// Upper bound on how much of an error body is read.
const MAX_ERROR_BODY: usize = 64 * 1024;

/// Lifecycle state of the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessorState {
    /// No request has been sent yet.
    #[default]
    Idle,
    /// A request is in flight.
    Active,
    /// The last request completed.
    Completed,
    /// The last request failed.
    Failed,
    /// The last request was stopped.
    Cancelled,
}

impl ProcessorState {
    /// Returns true while a request is in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, ProcessorState::Active)
    }
}

impl From<&StreamOutcome> for ProcessorState {
    fn from(outcome: &StreamOutcome) -> Self {
        match outcome {
            StreamOutcome::Completed => ProcessorState::Completed,
            StreamOutcome::Failed { .. } => ProcessorState::Failed,
            StreamOutcome::Cancelled => ProcessorState::Cancelled,
        }
    }
}

#[derive(Debug, Default)]
struct ProcessorInner {
    state: ProcessorState,
    cancel: Option<CancellationToken>,
    last_stats: StreamStats,
    sessions: u64,
}

/// Everything a session task needs, shared with the processor.
struct Shared {
    transport: Arc<dyn HttpTransport>,
    inner: Mutex<ProcessorInner>,
    metrics: SessionMetrics,
}

/// Streaming chat processor.
pub struct StreamProcessor {
    shared: Arc<Shared>,
    auth: Arc<dyn AuthProvider>,
    catalog: ModelCatalog,
    options: PayloadOptions,
    log_config: LogConfig,
    timeout: Option<Duration>,
}

impl StreamProcessor {
    /// Creates a new stream processor.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        auth: Arc<dyn AuthProvider>,
        catalog: ModelCatalog,
        options: PayloadOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                inner: Mutex::new(ProcessorInner::default()),
                metrics: SessionMetrics::new(),
            }),
            auth,
            catalog,
            options,
            log_config: LogConfig::default(),
            timeout: None,
        }
    }

    /// Sets the logging options used for frame warnings and failure text.
    ///
    /// Applies to sessions started afterwards; a session already in flight
    /// keeps the options it was started with.
    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Bounds each streamed exchange, body included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sends a conversation using the selected model.
    ///
    /// Fails with a configuration error, without touching the network, when
    /// no API key is configured or no tokio runtime is running, and with
    /// [`ChattyError::RequestInProgress`] while another request is active.
    #[instrument(skip(self, conversation), fields(messages = conversation.len()))]
    pub fn send(&self, conversation: &[Message]) -> ChattyResult<StreamHandle> {
        self.auth.validate()?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| ChattyError::configuration("No tokio runtime available"))?;

        let model = self.catalog.selected();
        let payload = build_payload(conversation, &model, &self.options);
        let body = serde_json::to_vec(&payload)?;

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        self.auth.apply_auth(&mut headers);

        let mut request = HttpRequest::post("chat/completions").with_body(body);
        request.headers = headers;
        if let Some(timeout) = self.timeout {
            request = request.with_timeout(timeout);
        }

        let token = CancellationToken::new();
        let session_id = {
            let mut inner = self.shared.inner.lock();
            if inner.state.is_active() {
                return Err(ChattyError::RequestInProgress);
            }
            inner.state = ProcessorState::Active;
            inner.cancel = Some(token.clone());
            inner.sessions += 1;
            inner.sessions
        };

        self.shared.metrics.record_started();
        debug!(session_id, model = %model, "Starting stream session");

        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::clone(&self.shared);
        let span = info_span!("stream_session", session_id, model = %model);
        let session = Session::new(Instant::now(), self.log_config.clone());
        runtime.spawn(run_session(shared, session, request, token, tx).instrument(span));

        Ok(StreamHandle { events: rx })
    }

    /// Stops the active request, if any. Calling it again has no effect.
    pub fn stop(&self) {
        let inner = self.shared.inner.lock();
        if !inner.state.is_active() {
            return;
        }
        if let Some(token) = &inner.cancel {
            if !token.is_cancelled() {
                debug!("Stop requested");
                token.cancel();
            }
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> ProcessorState {
        self.shared.inner.lock().state
    }

    /// Returns true while a request is in flight.
    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Statistics of the last finished session.
    pub fn last_stats(&self) -> StreamStats {
        self.shared.inner.lock().last_stats.clone()
    }

    /// Throughput of the last finished session.
    pub fn tokens_per_second(&self) -> f64 {
        self.shared.inner.lock().last_stats.tokens_per_second
    }

    /// Provider-reported token total of the last finished session, or 0.
    pub fn total_tokens_used(&self) -> u64 {
        self.shared.inner.lock().last_stats.total_tokens.unwrap_or(0)
    }

    /// Cost of the last session at the selected model's prompt price.
    pub fn estimated_cost(&self) -> f64 {
        match self.catalog.current() {
            Some(model) => self.total_tokens_used() as f64 * model.cost_per_token,
            None => 0.0,
        }
    }

    /// Returns the session counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Returns the shared model catalog.
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }
}

impl std::fmt::Debug for StreamProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamProcessor")
            .field("state", &self.state())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Receiving side of a streaming request.
///
/// Implements [`Stream`]; the stream ends after the `Finished` event.
/// Dropping the handle before then stops the session as if
/// [`StreamProcessor::stop`] had been called.
#[derive(Debug)]
pub struct StreamHandle {
    events: mpsc::UnboundedReceiver<StreamEvent>,
}

/// Accumulated result of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedReply {
    /// Concatenated delta text.
    pub content: String,
    /// Number of delta events received.
    pub deltas: usize,
    /// Terminal report.
    pub summary: StreamSummary,
}

impl StreamHandle {
    /// Receives the next event, or `None` after the session has ended.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Drains the session and returns the full reply.
    pub async fn collect_reply(mut self) -> CollectedReply {
        let mut content = String::new();
        let mut deltas = 0;

        while let Some(event) = self.events.recv().await {
            match event {
                StreamEvent::Delta { content: text, .. } => {
                    content.push_str(&text);
                    deltas += 1;
                }
                StreamEvent::Finished(summary) => {
                    return CollectedReply {
                        content,
                        deltas,
                        summary,
                    };
                }
            }
        }

        CollectedReply {
            content,
            deltas,
            summary: StreamSummary {
                outcome: StreamOutcome::Failed {
                    message: "Stream task ended without a result".to_string(),
                },
                stats: StreamStats::default(),
            },
        }
    }
}

impl Stream for StreamHandle {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

async fn run_session(
    shared: Arc<Shared>,
    mut session: Session,
    request: HttpRequest,
    token: CancellationToken,
    tx: mpsc::UnboundedSender<StreamEvent>,
) {
    let outcome = tokio::select! {
        biased;
        _ = token.cancelled() => StreamOutcome::Cancelled,
        _ = tx.closed() => {
            debug!("Stream handle dropped, abandoning session");
            token.cancel();
            StreamOutcome::Cancelled
        }
        outcome = session.drive(&shared, request, &token, &tx) => outcome,
    };

    let stats = session.finish();

    let outcome = {
        let mut inner = shared.inner.lock();
        // A stop that raced the end of the body still wins.
        let outcome = if token.is_cancelled() {
            StreamOutcome::Cancelled
        } else {
            outcome
        };
        inner.state = ProcessorState::from(&outcome);
        inner.cancel = None;
        inner.last_stats = stats.clone();
        outcome
    };

    shared.metrics.record_outcome(&outcome);
    match &outcome {
        StreamOutcome::Completed => debug!(tokens = stats.token_count, "Stream completed"),
        StreamOutcome::Cancelled => debug!(tokens = stats.token_count, "Stream cancelled"),
        StreamOutcome::Failed { message } => warn!(error = %message, "Stream failed"),
    }

    let _ = tx.send(StreamEvent::Finished(StreamSummary { outcome, stats }));
}

/// Per-request framing and statistics.
#[derive(Debug)]
struct Session {
    lines: LineBuffer,
    stats: StreamStats,
    started: Instant,
    log_config: LogConfig,
}

impl Session {
    fn new(started: Instant, log_config: LogConfig) -> Self {
        Self {
            lines: LineBuffer::new(),
            stats: StreamStats::started_now(),
            started,
            log_config,
        }
    }

    async fn drive(
        &mut self,
        shared: &Shared,
        request: HttpRequest,
        token: &CancellationToken,
        tx: &mpsc::UnboundedSender<StreamEvent>,
    ) -> StreamOutcome {
        let response = match shared.transport.send_streaming(request).await {
            Ok(response) => response,
            Err(e) => return self.failed(&ChattyError::from(e).to_string()),
        };

        if !response.is_success() {
            let body = read_error_body(response.stream).await;
            let message = format!(
                "HTTP {}: {}",
                response.status,
                status_message(response.status, &body)
            );
            return self.failed(&message);
        }

        let mut body = response.stream;
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return self.failed(&ChattyError::from(e).to_string()),
            };

            for line in self.lines.push(&chunk) {
                if token.is_cancelled() {
                    return StreamOutcome::Cancelled;
                }
                if let Some(event) = self.handle_line(&line, shared) {
                    shared.metrics.record_delta();
                    let _ = tx.send(event);
                }
            }
        }

        if !self.lines.is_empty() {
            debug!(bytes = self.lines.pending().len(), "Discarding unterminated trailing line");
        }

        StreamOutcome::Completed
    }

    /// Applies one line, returning the delta to emit, if any.
    fn handle_line(&mut self, line: &str, shared: &Shared) -> Option<StreamEvent> {
        match parse_line(line) {
            SseLine::Ignored | SseLine::Done => None,
            SseLine::Malformed { payload, error } => {
                shared.metrics.record_frame_skipped();
                let error = ChattyError::FrameParse {
                    message: error,
                    payload: self.log_config.scrub(&payload),
                };
                // Debug output carries the payload, Display does not.
                if self.log_config.log_frame_payloads {
                    warn!(error = ?error, "Skipping malformed stream frame");
                } else {
                    warn!(error = %error, "Skipping malformed stream frame");
                }
                None
            }
            SseLine::Chunk(chunk) => {
                if let Some(total) = chunk.total_tokens() {
                    self.stats.total_tokens = Some(total);
                }

                let content = chunk.delta_content()?;
                self.stats.token_count += 1;
                let elapsed_ms = self.started.elapsed().as_millis();
                if let Some(rate) = throughput(self.stats.token_count, elapsed_ms) {
                    self.stats.tokens_per_second = rate;
                }

                Some(StreamEvent::Delta {
                    content: content.to_string(),
                    token_count: self.stats.token_count,
                    tokens_per_second: self.stats.tokens_per_second,
                })
            }
        }
    }

    fn failed(&self, message: &str) -> StreamOutcome {
        StreamOutcome::Failed {
            message: self.log_config.scrub(message),
        }
    }

    fn finish(mut self) -> StreamStats {
        self.stats.ended_at = Some(chrono::Utc::now());
        self.stats
    }
}

/// Tokens per second, or `None` when no time has elapsed.
fn throughput(token_count: u64, elapsed_ms: u128) -> Option<f64> {
    if elapsed_ms == 0 {
        return None;
    }
    Some(token_count as f64 * 1000.0 / elapsed_ms as f64)
}

async fn read_error_body(mut stream: ByteStream) -> Vec<u8> {
    let mut body = Vec::new();
    while let Some(Ok(chunk)) = stream.next().await {
        body.extend_from_slice(&chunk);
        if body.len() >= MAX_ERROR_BODY {
            break;
        }
    }
    body
}
