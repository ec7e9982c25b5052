//! Integration tests for the model catalog

use super::*;
use chatty_client::{default_catalog, ChattyError, Message};

fn model_list_body() -> serde_json::Value {
    json!({
        "data": [
            {
                "id": "openai/gpt-4o",
                "name": "GPT-4o",
                "description": "Multimodal flagship",
                "context_length": 128000,
                "pricing": {"prompt": "0.000005", "completion": "0.000015"},
                "modalities": ["text", "image"]
            },
            {
                "id": "mistralai/mistral-7b-instruct",
                "name": "Mistral 7B Instruct",
                "pricing": {"prompt": 0.0000002}
            }
        ]
    })
}

#[tokio::test]
async fn test_models_refresh_integration_success() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("GET", "/api/v1/models")
        .respond_with(ResponseTemplate::new(200).set_body_json(model_list_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server).build().unwrap();
    assert_eq!(client.models().models().len(), 7);

    let count = client.models().refresh().await.unwrap();

    assert_eq!(count, 2);
    let gpt4o = client.models().get("openai/gpt-4o").unwrap();
    assert_eq!(gpt4o.name, "GPT-4o");
    assert_eq!(gpt4o.max_tokens, 128000);
    assert!(gpt4o.supports_images);
    assert!((gpt4o.cost_per_token - 0.000005).abs() < 1e-12);

    let mistral = client.models().get("mistralai/mistral-7b-instruct").unwrap();
    assert_eq!(mistral.max_tokens, 4096);
    assert!(!mistral.supports_images);
    assert_eq!(mistral.provider, "mistralai");
}

#[tokio::test]
async fn test_refreshed_catalog_prices_selected_model() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("GET", "/api/v1/models")
        .respond_with(ResponseTemplate::new(200).set_body_json(model_list_body()))
        .mount(&mock_server)
        .await;
    mock_with_auth("POST", "/api/v1/chat/completions")
        .respond_with(sse_response(sse_body(&["ok"], 1000)))
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server).build().unwrap();
    client.models().refresh().await.unwrap();
    client.select_model("openai/gpt-4o");

    client
        .stream()
        .send(&[Message::user("Hi")])
        .unwrap()
        .collect_reply()
        .await;

    assert_eq!(client.models().current().unwrap().id, "openai/gpt-4o");
    assert!((client.stream().estimated_cost() - 0.005).abs() < 1e-9);
}

#[tokio::test]
async fn test_models_refresh_authentication_error_keeps_catalog() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/models"))
        .respond_with(error_response(401, "Invalid API key"))
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server).build().unwrap();

    let err = client.models().refresh().await.unwrap_err();

    assert!(matches!(err, ChattyError::Authentication { .. }));
    assert_eq!(client.models().models(), default_catalog());
}

#[tokio::test]
async fn test_models_refresh_malformed_body_keeps_catalog() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server).build().unwrap();

    assert!(client.models().refresh().await.is_err());
    assert_eq!(client.models().models().len(), 7);
}

#[tokio::test]
async fn test_models_refresh_error_body_with_ok_status_keeps_catalog() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("GET", "/api/v1/models")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"message": "upstream down", "code": 502}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_builder(&mock_server).build().unwrap();

    let err = client.models().refresh().await.unwrap_err();

    assert!(matches!(err, ChattyError::Serialization { .. }));
    assert_eq!(client.models().models(), default_catalog());
}

#[tokio::test]
async fn test_models_refresh_without_api_key_issues_no_request() {
    let mock_server = setup_mock_server().await;

    let client = ChattyClient::builder()
        .base_url(format!("{}/api/v1", mock_server.uri()))
        .build()
        .unwrap();

    let err = client.models().refresh().await.unwrap_err();

    assert!(err.is_configuration());
    let received = mock_server.received_requests().await.unwrap_or_default();
    assert!(received.is_empty());
}
