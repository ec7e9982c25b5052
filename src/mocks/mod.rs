//! Mock implementations for testing.
//!
//! Provides a scripted transport and a mock auth provider so the streaming
//! pipeline can be exercised without network access.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::auth::AuthProvider;
use crate::errors::ChattyError;
use crate::transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, StreamingResponse, TransportError,
};

/// A recorded request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request path.
    pub path: String,
    /// Request body.
    pub body: Option<Vec<u8>>,
    /// Request headers.
    pub headers: HashMap<String, String>,
}

impl RecordedRequest {
    /// Parses the body as JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_slice(body).ok())
    }
}

/// How the body of a scripted response ends.
#[derive(Debug, Clone)]
enum BodyEnd {
    /// The stream ends after the last chunk.
    Close,
    /// The stream yields an error after the last chunk.
    Error(TransportError),
    /// The stream never ends after the last chunk.
    Pending,
}

/// A scripted response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    chunks: Vec<Bytes>,
    end: BodyEnd,
    chunk_delay: Option<Duration>,
}

impl MockResponse {
    /// Creates a response with a single-chunk body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            chunks: vec![body.into()],
            end: BodyEnd::Close,
            chunk_delay: None,
        }
    }

    /// Creates a successful JSON response.
    pub fn json<T: serde::Serialize>(value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        Self::new(200, body).with_header("content-type", "application/json")
    }

    /// Creates an error response with an OpenAI-style error body.
    pub fn error(status: u16, message: &str) -> Self {
        let error = serde_json::json!({
            "error": {
                "message": message,
                "code": status
            }
        });

        let body = serde_json::to_vec(&error).unwrap_or_default();
        Self::new(status, body).with_header("content-type", "application/json")
    }

    /// Creates a 200 response whose body arrives as the given chunks.
    pub fn chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Bytes>,
    {
        Self {
            status: 200,
            headers: HashMap::from([(
                "content-type".to_string(),
                "text/event-stream".to_string(),
            )]),
            chunks: chunks.into_iter().map(Into::into).collect(),
            end: BodyEnd::Close,
            chunk_delay: None,
        }
    }

    /// Creates a 200 event stream for the given deltas, ending with `[DONE]`.
    pub fn sse<S: AsRef<str>>(deltas: &[S]) -> Self {
        Self::chunks([fixtures::sse_body(deltas)])
    }

    /// Sets the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Makes the body stream fail after the scripted chunks.
    pub fn then_error(mut self, error: TransportError) -> Self {
        self.end = BodyEnd::Error(error);
        self
    }

    /// Keeps the body stream open forever after the scripted chunks.
    pub fn then_pending(mut self) -> Self {
        self.end = BodyEnd::Pending;
        self
    }

    /// Sleeps before each chunk.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    fn body(&self) -> Vec<u8> {
        self.chunks.iter().flat_map(|c| c.iter().copied()).collect()
    }
}

/// Scripted outcome of a single call.
#[derive(Debug, Clone)]
enum MockReply {
    Respond(MockResponse),
    Fail(TransportError),
    Hang,
}

/// Mock HTTP transport for testing.
///
/// Replies are consumed in the order they were queued; when the queue is
/// empty the default response is used, or a 500 error if none is set.
pub struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
    default_response: Mutex<Option<MockResponse>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            default_response: Mutex::new(None),
        }
    }

    /// Queues a response.
    pub fn queue(&self, response: MockResponse) {
        self.replies.lock().push_back(MockReply::Respond(response));
    }

    /// Queues a JSON response.
    pub fn queue_json<T: serde::Serialize>(&self, value: &T) {
        self.queue(MockResponse::json(value));
    }

    /// Queues an error response.
    pub fn queue_error(&self, status: u16, message: &str) {
        self.queue(MockResponse::error(status, message));
    }

    /// Queues an event stream carrying the given deltas.
    pub fn queue_sse<S: AsRef<str>>(&self, deltas: &[S]) {
        self.queue(MockResponse::sse(deltas));
    }

    /// Queues a transport failure before any response arrives.
    pub fn queue_failure(&self, error: TransportError) {
        self.replies.lock().push_back(MockReply::Fail(error));
    }

    /// Queues a call that never returns.
    pub fn queue_hang(&self) {
        self.replies.lock().push_back(MockReply::Hang);
    }

    /// Sets the default response.
    pub fn set_default(&self, response: MockResponse) {
        *self.default_response.lock() = Some(response);
    }

    /// Gets all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Gets the last recorded request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }

    /// Clears recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    /// Returns the number of requests made.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_reply(&self) -> MockReply {
        if let Some(reply) = self.replies.lock().pop_front() {
            return reply;
        }

        let response = self
            .default_response
            .lock()
            .clone()
            .unwrap_or_else(|| MockResponse::error(500, "No mock response configured"));
        MockReply::Respond(response)
    }

    fn record_request(&self, request: &HttpRequest) {
        self.requests.lock().push(RecordedRequest {
            method: request.method,
            path: request.path.clone(),
            body: request.body.clone(),
            headers: request.headers.clone(),
        });
    }

    async fn resolve(&self, request: &HttpRequest) -> Result<MockResponse, TransportError> {
        self.record_request(request);

        match self.next_reply() {
            MockReply::Respond(response) => Ok(response),
            MockReply::Fail(error) => Err(error),
            MockReply::Hang => futures::future::pending().await,
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self.resolve(&request).await?;

        if let BodyEnd::Error(error) = &response.end {
            return Err(error.clone());
        }

        Ok(HttpResponse {
            status: response.status,
            headers: response.headers.clone(),
            body: response.body(),
        })
    }

    async fn send_streaming(
        &self,
        request: HttpRequest,
    ) -> Result<StreamingResponse, TransportError> {
        let response = self.resolve(&request).await?;
        let delay = response.chunk_delay;

        let chunks = stream::iter(response.chunks.into_iter().map(Ok::<Bytes, TransportError>)).then(move |chunk| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            chunk
        });

        let stream = match response.end {
            BodyEnd::Close => chunks.boxed(),
            BodyEnd::Error(error) => chunks.chain(stream::once(async move { Err(error) })).boxed(),
            BodyEnd::Pending => chunks.chain(stream::pending()).boxed(),
        };

        Ok(StreamingResponse {
            status: response.status,
            headers: response.headers,
            stream,
        })
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("request_count", &self.request_count())
            .finish()
    }
}

/// Mock auth provider for testing.
pub struct MockAuth {
    api_key: String,
}

impl MockAuth {
    /// Creates a new mock auth provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl Default for MockAuth {
    fn default() -> Self {
        Self::new("sk-or-mock-test-key")
    }
}

impl AuthProvider for MockAuth {
    fn apply_auth(&self, headers: &mut HashMap<String, String>) {
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        );
    }

    fn scheme(&self) -> &str {
        "Bearer"
    }

    fn validate(&self) -> Result<(), ChattyError> {
        if self.api_key.is_empty() {
            return Err(ChattyError::configuration("API key not configured"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MockAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAuth").finish()
    }
}

/// Test fixtures for wire payloads.
pub mod fixtures {
    use serde_json::json;

    /// One `data:` line carrying a content delta.
    pub fn sse_frame(content: &str) -> String {
        let chunk = json!({
            "id": "gen-mock",
            "model": "openai/gpt-3.5-turbo",
            "choices": [{"index": 0, "delta": {"content": content}}]
        });
        format!("data: {chunk}\n\n")
    }

    /// One `data:` line carrying the usage total.
    pub fn usage_frame(total_tokens: u64) -> String {
        let chunk = json!({
            "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}],
            "usage": {"total_tokens": total_tokens}
        });
        format!("data: {chunk}\n\n")
    }

    /// The end-of-stream sentinel line.
    pub fn done_frame() -> String {
        "data: [DONE]\n\n".to_string()
    }

    /// A complete event-stream body for the given deltas.
    pub fn sse_body<S: AsRef<str>>(deltas: &[S]) -> String {
        let mut body: String = deltas.iter().map(|d| sse_frame(d.as_ref())).collect();
        body.push_str(&done_frame());
        body
    }

    /// A `/models` response body.
    pub fn model_list() -> serde_json::Value {
        json!({
            "data": [
                {
                    "id": "openai/gpt-4o",
                    "name": "GPT-4o",
                    "description": "Multimodal flagship",
                    "owned_by": "openai",
                    "context_length": 128000,
                    "pricing": {"prompt": "0.000005", "completion": "0.000015"},
                    "modalities": ["text", "vision"]
                },
                {
                    "id": "mistralai/mistral-7b-instruct",
                    "name": "Mistral 7B Instruct",
                    "context_length": 32768,
                    "pricing": {"prompt": "0.0000002"}
                }
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_mock_transport_queue() {
        let transport = MockTransport::new();
        transport.queue_json(&serde_json::json!({"test": "value"}));

        let response = transport.send(HttpRequest::get("test")).await.unwrap();

        assert_eq!(response.status, 200);
        assert!(String::from_utf8_lossy(&response.body).contains("value"));
    }

    #[tokio::test]
    async fn test_mock_transport_records_requests() {
        let transport = MockTransport::new();
        transport.set_default(MockResponse::json(&serde_json::json!({})));

        transport.send(HttpRequest::get("path1")).await.unwrap();
        transport
            .send(HttpRequest::post("path2").with_body(b"{\"a\":1}".to_vec()))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, "path1");
        assert_eq!(requests[1].json().unwrap()["a"], 1);
    }

    #[tokio::test]
    async fn test_mock_transport_streams_chunks_in_order() {
        let transport = MockTransport::new();
        transport.queue(MockResponse::chunks(["ab", "cd", "ef"]));

        let response = transport
            .send_streaming(HttpRequest::post("chat/completions"))
            .await
            .unwrap();
        let chunks: Vec<Bytes> = response.stream.try_collect().await.unwrap();

        assert_eq!(chunks, vec![Bytes::from("ab"), Bytes::from("cd"), Bytes::from("ef")]);
    }

    #[tokio::test]
    async fn test_mock_transport_stream_error() {
        let transport = MockTransport::new();
        transport.queue(MockResponse::chunks(["ab"]).then_error(TransportError::Connection {
            message: "reset".to_string(),
        }));

        let mut response = transport
            .send_streaming(HttpRequest::post("chat/completions"))
            .await
            .unwrap();

        assert!(response.stream.next().await.unwrap().is_ok());
        assert!(response.stream.next().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_mock_transport_failure() {
        let transport = MockTransport::new();
        transport.queue_failure(TransportError::Timeout {
            timeout: Duration::from_secs(1),
        });

        let result = transport.send(HttpRequest::get("models")).await;

        assert!(matches!(result, Err(TransportError::Timeout { .. })));
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_sse_body_fixture() {
        let body = fixtures::sse_body(&["Hi"]);

        assert!(body.starts_with("data: {"));
        assert!(body.ends_with("data: [DONE]\n\n"));
    }
}
