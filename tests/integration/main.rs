//! Integration tests using WireMock
//!
//! These tests drive the client against a mock OpenRouter server through the
//! real reqwest transport, covering request shape, event-stream decoding,
//! cancellation and error reporting.

mod chat_stream;
mod models;

use chatty_client::{ChattyClient, ChattyClientBuilder};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_API_KEY: &str = "sk-or-integration-key";

/// Starts a mock server.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Builder pointed at the mock server's `/api/v1` prefix.
pub fn client_builder(server: &MockServer) -> ChattyClientBuilder {
    ChattyClient::builder()
        .api_key(TEST_API_KEY)
        .base_url(format!("{}/api/v1", server.uri()))
}

/// Mock that only matches authenticated requests.
pub fn mock_with_auth(method_matcher: &str, path_matcher: &str) -> wiremock::MockBuilder {
    Mock::given(method(method_matcher))
        .and(path(path_matcher))
        .and(header("Authorization", format!("Bearer {TEST_API_KEY}").as_str()))
}

/// One `data:` line carrying a content delta.
pub fn sse_frame(content: &str) -> String {
    let chunk = json!({
        "id": "gen-integration",
        "model": "openai/gpt-3.5-turbo",
        "choices": [{"index": 0, "delta": {"content": content}}]
    });
    format!("data: {chunk}\n\n")
}

/// An event-stream body for the given deltas, ending with usage and `[DONE]`.
pub fn sse_body(deltas: &[&str], total_tokens: u64) -> String {
    let mut body: String = deltas.iter().map(|d| sse_frame(d)).collect();
    let usage = json!({
        "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 9, "completion_tokens": total_tokens - 9, "total_tokens": total_tokens}
    });
    body.push_str(&format!("data: {usage}\n\n"));
    body.push_str("data: [DONE]\n\n");
    body
}

/// Event-stream success response.
pub fn sse_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

/// Provider-style error response.
pub fn error_response(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "error": {"message": message, "code": status}
    }))
}
