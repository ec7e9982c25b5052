//! Integration tests for streamed chat replies

use super::*;
use chatty_client::{
    Attachment, Message, MessageStatus, ProcessorState, StreamEvent, StreamOutcome,
};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use std::time::Duration;
use wiremock::matchers::body_partial_json;

#[tokio::test]
async fn test_stream_integration_success() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("POST", "/api/v1/chat/completions")
        .and(body_partial_json(json!({
            "model": "openai/gpt-3.5-turbo",
            "stream": true,
            "max_tokens": 2048,
            "messages": [{"role": "user", "content": "Say hello"}]
        })))
        .respond_with(sse_response(sse_body(&["Hel", "lo", " there"], 12)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server).build().unwrap();

    let reply = client
        .stream()
        .send(&[Message::user("Say hello")])
        .unwrap()
        .collect_reply()
        .await;

    assert_eq!(reply.content, "Hello there");
    assert_eq!(reply.deltas, 3);
    assert_eq!(reply.summary.outcome, StreamOutcome::Completed);
    assert_eq!(reply.summary.stats.token_count, 3);
    assert_eq!(reply.summary.stats.total_tokens, Some(12));

    assert_eq!(client.stream().state(), ProcessorState::Completed);
    assert_eq!(client.stream().total_tokens_used(), 12);
    let expected_cost = 12.0 * 0.000002;
    assert!((client.stream().estimated_cost() - expected_cost).abs() < 1e-12);
}

#[tokio::test]
async fn test_stream_updates_placeholder_message() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("POST", "/api/v1/chat/completions")
        .respond_with(sse_response(sse_body(&["Once", " upon", " a time"], 20)))
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server).build().unwrap();
    let mut reply = Message::assistant("");
    reply.start_streaming();

    let mut events = client.stream().send(&[Message::user("Story?")]).unwrap();
    while let Some(event) = events.next().await {
        reply.apply(&event);
    }

    assert_eq!(reply.content, "Once upon a time");
    assert_eq!(reply.status, MessageStatus::Complete);
    assert_eq!(reply.stats.token_count, 3);
}

#[tokio::test]
async fn test_stream_skips_malformed_frames() {
    let mock_server = setup_mock_server().await;

    let mut body = String::from(": OPENROUTER PROCESSING\n\n");
    body.push_str(&sse_frame("good"));
    body.push_str("data: {not json}\n\n");
    body.push_str(&sse_frame(" frames"));
    body.push_str("data: [DONE]\n\n");

    mock_with_auth("POST", "/api/v1/chat/completions")
        .respond_with(sse_response(body))
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server).build().unwrap();

    let reply = client
        .stream()
        .send(&[Message::user("Hi")])
        .unwrap()
        .collect_reply()
        .await;

    assert_eq!(reply.content, "good frames");
    assert_eq!(reply.summary.outcome, StreamOutcome::Completed);
    assert_eq!(client.stream().metrics().frames_skipped, 1);
}

#[tokio::test]
async fn test_stream_sends_image_attachments_inline() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("POST", "/api/v1/chat/completions")
        .and(body_partial_json(json!({
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "What is this?"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,iVBORw=="}}
                ]
            }]
        })))
        .respond_with(sse_response(sse_body(&["A pixel"], 30)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server).build().unwrap();
    let message = Message::user("What is this?").with_attachment(Attachment::new(
        "pixel.png",
        "image/png",
        vec![0x89, 0x50, 0x4E, 0x47],
    ));

    let reply = client
        .stream()
        .send(&[message])
        .unwrap()
        .collect_reply()
        .await;

    assert_eq!(reply.content, "A pixel");
}

#[tokio::test]
async fn test_stream_authentication_error() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(error_response(401, "No auth credentials found"))
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server).build().unwrap();

    let reply = client
        .stream()
        .send(&[Message::user("Hi")])
        .unwrap()
        .collect_reply()
        .await;

    assert_eq!(reply.deltas, 0);
    assert_eq!(
        reply.summary.outcome,
        StreamOutcome::Failed {
            message: "HTTP 401: No auth credentials found".to_string()
        }
    );
    assert_eq!(client.stream().state(), ProcessorState::Failed);
}

#[tokio::test]
async fn test_stream_server_error_without_body() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server).build().unwrap();

    let reply = client
        .stream()
        .send(&[Message::user("Hi")])
        .unwrap()
        .collect_reply()
        .await;

    match reply.summary.outcome {
        StreamOutcome::Failed { message } => assert!(message.starts_with("HTTP 503")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_stop_before_response() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("POST", "/api/v1/chat/completions")
        .respond_with(sse_response(sse_body(&["late"], 10)).set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server).build().unwrap();

    let handle = client.stream().send(&[Message::user("Hi")]).unwrap();
    assert!(client.stream().is_active());

    tokio::time::sleep(Duration::from_millis(100)).await;
    client.stream().stop();
    client.stream().stop();

    let reply = tokio::time::timeout(Duration::from_secs(5), handle.collect_reply())
        .await
        .unwrap();

    assert_eq!(reply.summary.outcome, StreamOutcome::Cancelled);
    assert_eq!(reply.content, "");
    assert_eq!(client.stream().state(), ProcessorState::Cancelled);
    assert_eq!(client.stream().metrics().sessions_cancelled, 1);
}

#[tokio::test]
async fn test_dropping_handle_frees_processor() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("POST", "/api/v1/chat/completions")
        .respond_with(sse_response(sse_body(&["late"], 10)).set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server).build().unwrap();

    drop(client.stream().send(&[Message::user("Hi")]).unwrap());

    tokio::time::timeout(Duration::from_secs(5), async {
        while client.stream().is_active() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(client.stream().state(), ProcessorState::Cancelled);
}

#[tokio::test]
async fn test_stream_timeout_reports_failure() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("POST", "/api/v1/chat/completions")
        .respond_with(sse_response(sse_body(&["late"], 10)).set_delay(Duration::from_secs(10)))
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server)
        .stream_timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let reply = tokio::time::timeout(
        Duration::from_secs(5),
        client.stream().send(&[Message::user("Hi")]).unwrap().collect_reply(),
    )
    .await
    .unwrap();

    assert!(matches!(reply.summary.outcome, StreamOutcome::Failed { .. }));
    assert_eq!(client.stream().state(), ProcessorState::Failed);
}

#[tokio::test]
async fn test_second_send_while_active_is_rejected() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("POST", "/api/v1/chat/completions")
        .respond_with(sse_response(sse_body(&["slow"], 10)).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server).build().unwrap();

    let first = client.stream().send(&[Message::user("One")]).unwrap();
    let err = client.stream().send(&[Message::user("Two")]).unwrap_err();
    assert!(err.is_configuration());

    let reply = first.collect_reply().await;
    assert_eq!(reply.content, "slow");
}

#[tokio::test]
async fn test_send_without_api_key_issues_no_request() {
    let mock_server = setup_mock_server().await;

    let client = ChattyClient::builder()
        .base_url(format!("{}/api/v1", mock_server.uri()))
        .build()
        .unwrap();

    let err = client.stream().send(&[Message::user("Hi")]).unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(client.stream().state(), ProcessorState::Idle);
    let received = mock_server.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());
}

#[tokio::test]
async fn test_events_end_with_single_finished() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("POST", "/api/v1/chat/completions")
        .respond_with(sse_response(sse_body(&["a", "b"], 11)))
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server).build().unwrap();

    let events: Vec<StreamEvent> = client
        .stream()
        .send(&[Message::user("Hi")])
        .unwrap()
        .collect()
        .await;

    assert_eq!(events.len(), 3);
    assert_eq!(events.iter().filter(|e| e.is_finished()).count(), 1);
    assert!(events[2].is_finished());
}
