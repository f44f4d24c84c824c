/*!
 * Translation client boundary.
 *
 * `SliceTranslator` is what the pipeline talks to: one call per slice, one
 * final result. Retries happen behind this boundary.
 */

use async_trait::async_trait;
use log::debug;

use crate::app_config::Config;
use crate::errors::ProviderError;
use crate::providers::ollama::{GenerationOptions, GenerationRequest, Ollama};
use crate::providers::Provider;
use super::retry::RetryPolicy;

/// Translates slice texts
#[async_trait]
pub trait SliceTranslator: Send + Sync {
    /// Translate one slice, returning the final outcome after any retries
    async fn translate(&self, text: &str) -> Result<String, ProviderError>;

    /// Check that the endpoint is reachable and the model answers
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

/// Ollama-backed translator with retry
#[derive(Debug)]
pub struct OllamaTranslator {
    client: Ollama,
    model: String,
    system_prompt: String,
    options: GenerationOptions,
    retry: RetryPolicy,
}

impl OllamaTranslator {
    pub fn new(
        client: Ollama,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        options: GenerationOptions,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            system_prompt: system_prompt.into(),
            options,
            retry,
        }
    }

    /// Build a translator from a validated configuration
    pub fn from_config(config: &Config) -> Self {
        let inference = &config.inference;
        Self::new(
            Ollama::new(inference.url.clone(), inference.timeout()),
            inference.model_name.clone(),
            config.system_prompt(),
            GenerationOptions {
                temperature: Some(inference.temperature),
                top_p: Some(inference.top_p),
                repeat_penalty: Some(inference.repeat_penalty),
            },
            config.retry_policy(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn request_for(&self, text: &str) -> GenerationRequest {
        GenerationRequest::new(self.model.as_str(), text)
            .system(self.system_prompt.as_str())
            .options(self.options.clone())
    }
}

#[async_trait]
impl SliceTranslator for OllamaTranslator {
    async fn translate(&self, text: &str) -> Result<String, ProviderError> {
        let response = self
            .retry
            .run(|attempt| {
                debug!("Sending {} bytes to {} (attempt {})", text.len(), self.model, attempt);
                self.client.complete(self.request_for(text))
            })
            .await?;

        Ok(Ollama::extract_text(&response))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.client.test_connection(&self.model).await
    }
}
