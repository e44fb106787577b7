//! HTTP behavior of the chat-completions client against a mock server.

use std::sync::Arc;
use std::time::Duration;

use docqa::{
    ChatMessage, Client, CompletionClient, CompletionRequest, DecodingParams, DispatchConfig,
    Document, Error, QueryRequest, QueryResponse, QueryService,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> Client {
    Client::builder()
        .api_key("gsk-test")
        .base_url(format!("{}/openai/v1", server.uri()))
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn request() -> CompletionRequest {
    CompletionRequest::new(
        "llama-3.1-8b-instant",
        vec![
            ChatMessage::system("Answer from the excerpt."),
            ChatMessage::user("Question: what?"),
        ],
        DecodingParams::default(),
    )
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "llama-3.1-8b-instant",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16 }
    })
}

#[tokio::test]
async fn test_complete_sends_fixed_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("authorization", "Bearer gsk-test"))
        .and(body_partial_json(json!({
            "model": "llama-3.1-8b-instant",
            "stream": false,
            "max_tokens": 500,
            "messages": [
                { "role": "system", "content": "Answer from the excerpt." },
                { "role": "user", "content": "Question: what?" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("It is 42.")))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server).complete(request()).await.unwrap();
    assert_eq!(text, "It is 42.");

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert!(body.get("stop").is_none());
}

#[tokio::test]
async fn test_rate_limit_maps_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "7")
                .set_body_json(json!({ "error": { "message": "slow down" } })),
        )
        .mount(&server)
        .await;

    let err = client(&server).complete(request()).await.unwrap_err();
    assert!(matches!(err, Error::RateLimit { .. }));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    assert_eq!(err.status_code(), Some(429));
}

#[tokio::test]
async fn test_error_body_becomes_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Invalid API Key",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        })))
        .mount(&server)
        .await;

    let err = client(&server).complete(request()).await.unwrap_err();
    match err {
        Error::Api {
            message,
            status,
            error_type,
        } => {
            assert_eq!(message, "Invalid API Key");
            assert_eq!(status, Some(401));
            assert_eq!(error_type.as_deref(), Some("invalid_request_error"));
        }
        other => panic!("Expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_plain_text_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client(&server).complete(request()).await.unwrap_err();
    assert_eq!(err.status_code(), Some(502));
    assert!(err.to_string().contains("bad gateway"));
}

#[tokio::test]
async fn test_success_status_with_error_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "error": { "message": "context length exceeded" } })),
        )
        .mount(&server)
        .await;

    let err = client(&server).complete(request()).await.unwrap_err();
    assert!(matches!(err, Error::Api { .. }));
    assert!(err.to_string().contains("context length exceeded"));
}

#[tokio::test]
async fn test_malformed_success_payloads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "max_tokens": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "max_tokens": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client
        .complete(request().with_max_tokens(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));

    let err = client
        .complete(request().with_max_tokens(2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
}

#[tokio::test]
async fn test_connection_failure_is_network_error() {
    // Nothing listens on a port freed right after binding it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let uri = format!("http://127.0.0.1:{}/v1", port);

    let client = Client::builder()
        .api_key("gsk-test")
        .base_url(uri)
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let err = client.complete(request()).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_query_service_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(" Twelve members. ")))
        .expect(1)
        .mount(&server)
        .await;

    let config = DispatchConfig {
        pacing_delay: Duration::ZERO,
        ..Default::default()
    };
    let service = QueryService::new(Arc::new(client(&server)), config).unwrap();
    let documents = vec![
        Document::new("board.pdf", "The board has twelve members.", "https://city.example"),
        Document::new("other.pdf", "Unrelated text.", "https://other.example"),
    ];

    let response = service
        .ask(
            &QueryRequest::new("How many members?", "https://city.example"),
            &documents,
            &CancellationToken::new(),
        )
        .await;
    assert_eq!(response, QueryResponse::answer("Twelve members."));
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({ "answer": "Twelve members." })
    );
}
