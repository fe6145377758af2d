//! Integration tests for the AI completion client
//!
//! Tests HTTP behavior against a wiremock server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use competitive_research_agents::config::{OpenAiConfig, RequestConfig};
use competitive_research_agents::error::CompletionError;
use competitive_research_agents::openai::{
    CompletionRequest, CompletionService, Message, OpenAiClient,
};

fn create_test_client(base_url: &str) -> OpenAiClient {
    let config = OpenAiConfig {
        api_key: "test-api-key".to_string(),
        base_url: base_url.to_string(),
        model: "gpt-4o-mini".to_string(),
        temperature: 0.7,
    };

    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_retries: 0,
        retry_delay_ms: 100,
        max_concurrent_searches: 5,
    };

    OpenAiClient::new(&config, &request_config).expect("Failed to create client")
}

fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "choices": [
            {
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }
        ]
    })
}

#[tokio::test]
async fn test_successful_completion() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer test-api-key"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("It depends.")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let request = CompletionRequest::new(vec![Message::user("What do chatbots cost?")]);
    let result = client.complete(request).await;

    assert_eq!(result.unwrap(), "It depends.");
}

#[tokio::test]
async fn test_json_mode_sets_response_format() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("{}")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let request =
        CompletionRequest::new(vec![Message::user("Extract")]).with_json_output();
    let result = client.complete(request).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_temperature_override() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"temperature": 0.2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let request = CompletionRequest::new(vec![Message::user("hi")]).with_temperature(0.2);

    assert!(client.complete(request).await.is_ok());
}

#[tokio::test]
async fn test_api_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Invalid API key", "type": "authentication_error"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let request = CompletionRequest::new(vec![Message::user("hi")]);
    let result = client.complete(request).await;

    match result {
        Err(CompletionError::Api { status, .. }) => assert_eq!(status, 401),
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_malformed_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not valid json"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let request = CompletionRequest::new(vec![Message::user("hi")]);
    let result = client.complete(request).await;

    assert!(matches!(
        result,
        Err(CompletionError::MalformedResponse { .. })
    ));
}

#[tokio::test]
async fn test_empty_choices_is_malformed_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server.uri());
    let request = CompletionRequest::new(vec![Message::user("hi")]);
    let result = client.complete(request).await;

    assert!(matches!(
        result,
        Err(CompletionError::MalformedResponse { .. })
    ));
}

#[tokio::test]
async fn test_request_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("slow"))
                .set_delay(std::time::Duration::from_secs(10)),
        )
        .mount(&mock_server)
        .await;

    let config = OpenAiConfig {
        api_key: "test-api-key".to_string(),
        base_url: mock_server.uri(),
        model: "gpt-4o-mini".to_string(),
        temperature: 0.7,
    };
    let request_config = RequestConfig {
        timeout_ms: 100,
        max_retries: 0,
        retry_delay_ms: 100,
        max_concurrent_searches: 5,
    };
    let client = OpenAiClient::new(&config, &request_config).unwrap();

    let result = client
        .complete(CompletionRequest::new(vec![Message::user("hi")]))
        .await;

    assert!(matches!(result, Err(CompletionError::Timeout { .. })));
}
