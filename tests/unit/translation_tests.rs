/*!
 * Tests for the retrying Ollama translator
 */

use slice_translator::errors::ProviderError;
use slice_translator::translation::{OllamaTranslator, SliceTranslator};
use crate::common::{self, fake_ollama::{FakeOllama, Reply}};

fn translator_for(server: &FakeOllama, retries: u32) -> OllamaTranslator {
    let mut config = common::test_config(1024);
    config.inference.url = server.url.clone();
    config.inference.retries = retries;
    config.translation.target_language = "French".to_string();
    OllamaTranslator::from_config(&config)
}

#[tokio::test]
async fn test_translate_afterTransientErrors_shouldRetryAndSucceed() {
    common::init_logger();
    let server = FakeOllama::start(vec![
        Reply::error(503, "loading model"),
        Reply::error(500, "oops"),
        Reply::ok(" Bonjour. \n"),
    ])
    .await;

    let result = translator_for(&server, 3).translate("Hello.").await;

    assert_eq!(result, Ok("Bonjour.".to_string()));
    assert_eq!(server.request_count(), 3);
}

#[tokio::test]
async fn test_translate_whenRetriesExhausted_shouldReturnLastError() {
    let server = FakeOllama::start(vec![Reply::error(503, "still loading")]).await;

    let result = translator_for(&server, 3).translate("Hello.").await;

    assert_eq!(
        result,
        Err(ProviderError::ApiError {
            status_code: 503,
            message: "still loading".to_string()
        })
    );
    assert_eq!(server.request_count(), 3);
}

#[tokio::test]
async fn test_translate_withClientError_shouldNotRetry() {
    let server = FakeOllama::start(vec![Reply::error(400, "invalid options")]).await;

    let result = translator_for(&server, 3).translate("Hello.").await;

    assert!(matches!(result, Err(ProviderError::ApiError { status_code: 400, .. })));
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn test_translate_shouldSendRenderedSystemPrompt() {
    let server = FakeOllama::start(vec![Reply::ok("Salut.")]).await;

    translator_for(&server, 1).translate("Hi.").await.unwrap();

    let system = server.requests()[0]["system"].as_str().unwrap_or_default().to_string();
    assert!(system.contains("Return ONLY the French translation"));
    assert!(!system.contains("{target_language}"));
}
