/*!
 * Tests for the Ollama client against a local scripted server
 */

use std::time::Duration;

use slice_translator::errors::ProviderError;
use slice_translator::providers::ollama::{GenerationOptions, GenerationRequest, Ollama};
use slice_translator::providers::Provider;
use crate::common::fake_ollama::{FakeOllama, Reply};

#[tokio::test]
async fn test_complete_shouldSendOllamaPayload() {
    let server = FakeOllama::start(vec![Reply::ok("  Bonjour le monde.\n")]).await;
    let client = Ollama::new(server.url.clone(), Duration::from_secs(5));

    let request = GenerationRequest::new("gemma3:latest", "Hello world.")
        .system("Translate into French")
        .options(GenerationOptions {
            temperature: Some(0.1),
            top_p: Some(0.9),
            repeat_penalty: Some(1.2),
        });
    let response = client.complete(request).await.unwrap();

    assert_eq!(Ollama::extract_text(&response), "Bonjour le monde.");
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["model"], "gemma3:latest");
    assert_eq!(requests[0]["system"], "Translate into French");
    assert_eq!(requests[0]["prompt"], "Hello world.");
    assert_eq!(requests[0]["stream"], false);
    assert!(requests[0]["options"]["top_p"].is_number());
}

#[tokio::test]
async fn test_complete_withModelMissing_shouldReturnApiError() {
    let server = FakeOllama::start(vec![Reply::error(404, "model 'nope' not found")]).await;
    let client = Ollama::new(server.url.clone(), Duration::from_secs(5));

    let result = client.complete(GenerationRequest::new("nope", "Hi")).await;

    assert_eq!(
        result.unwrap_err(),
        ProviderError::ApiError {
            status_code: 404,
            message: "model 'nope' not found".to_string()
        }
    );
}

#[tokio::test]
async fn test_complete_withStreamedBody_shouldConcatenateFragments() {
    let body = "{\"model\":\"m\",\"response\":\"Hal\",\"done\":false}\n{\"model\":\"m\",\"response\":\"lo.\",\"done\":true}\n";
    let server = FakeOllama::start(vec![Reply::Status(200, body.to_string())]).await;
    let client = Ollama::new(server.url.clone(), Duration::from_secs(5));

    let response = client.complete(GenerationRequest::new("m", "Hello.")).await.unwrap();

    assert_eq!(response.response, "Hallo.");
}

#[tokio::test]
async fn test_complete_withNonJsonBody_shouldReturnParseError() {
    let server = FakeOllama::start(vec![Reply::Status(200, "not json at all".to_string())]).await;
    let client = Ollama::new(server.url.clone(), Duration::from_secs(5));

    let result = client.complete(GenerationRequest::new("m", "Hello.")).await;

    assert!(matches!(result, Err(ProviderError::ParseError(_))));
}

#[tokio::test]
async fn test_complete_withSlowServer_shouldReturnTimeoutError() {
    let server = FakeOllama::start(vec![Reply::Delayed(Duration::from_secs(2), String::new())]).await;
    let client = Ollama::new(server.url.clone(), Duration::from_millis(200));

    let result = client.complete(GenerationRequest::new("m", "Hello.")).await;

    assert!(matches!(result, Err(ProviderError::TimeoutError(_))), "got {:?}", result);
}

#[tokio::test]
async fn test_testConnection_shouldSendHelloWithModel() {
    let server = FakeOllama::start(vec![Reply::ok("Hi!")]).await;
    let client = Ollama::new(server.url.clone(), Duration::from_secs(5));

    client.test_connection("gemma3:latest").await.unwrap();

    let requests = server.requests();
    assert_eq!(requests[0]["prompt"], "Hello");
    assert_eq!(requests[0]["model"], "gemma3:latest");
}

#[tokio::test]
async fn test_testConnection_withNothingListening_shouldReturnConnectionError() {
    let client = Ollama::new("http://127.0.0.1:9/api/generate", Duration::from_secs(2));

    let result = client.test_connection("m").await;

    assert!(matches!(result, Err(ProviderError::ConnectionError(_))));
}
