use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::ProviderError;
use super::Provider;

/// Ollama client for the `/api/generate` endpoint
pub struct Ollama {
    /// Full URL of the generate endpoint
    url: String,
    /// HTTP client for making requests
    client: Client,
    /// Per-request timeout
    timeout: Duration,
}

impl fmt::Debug for Ollama {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ollama")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Generate request for the Ollama API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Top-p sampling (default: 0.9)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Penalty for repeated tokens (default: 1.1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: Some(false),
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the sampling options
    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = Some(options);
        self
    }

}

impl Ollama {
    /// Create a client for the given generate endpoint URL
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client: Client::builder()
                .timeout(timeout)
                // Ollama speaks HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            timeout,
        }
    }

    /// Send one generation request. No retries happen here.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        self.post(request, self.timeout).await
    }

    async fn post(&self, request: &GenerationRequest, timeout: Duration) -> Result<GenerationResponse, ProviderError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| map_transport_error(&e, timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(&e, timeout))?;

        if !status.is_success() {
            error!("Ollama API error ({}): {}", status, truncate(&body, 500));
            return Err(api_error(status, &body));
        }

        parse_generation_body(&body)
    }
}

#[async_trait]
impl Provider for Ollama {
    type Request = GenerationRequest;
    type Response = GenerationResponse;

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        self.generate(&request).await
    }

    /// Sends a tiny generation with a short timeout, using whatever model
    /// the request would use.
    async fn test_connection(&self, model: &str) -> Result<(), ProviderError> {
        let request = GenerationRequest::new(model, "Hello");
        self.post(&request, Duration::from_secs(10)).await.map(|_| ())
    }

    fn extract_text(response: &Self::Response) -> String {
        response.response.trim().to_string()
    }
}

fn map_transport_error(error: &reqwest::Error, timeout: Duration) -> ProviderError {
    if error.is_timeout() {
        ProviderError::TimeoutError(format!("no response within {}s: {}", timeout.as_secs_f64(), error))
    } else if error.is_decode() {
        ProviderError::ParseError(error.to_string())
    } else {
        ProviderError::ConnectionError(error.to_string())
    }
}

fn api_error(status: StatusCode, body: &str) -> ProviderError {
    // Ollama reports failures as {"error": "..."}
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| truncate(body, 500));
    ProviderError::ApiError {
        status_code: status.as_u16(),
        message,
    }
}

/// Parse a generate response body.
///
/// Accepts a single JSON object, or a JSONL stream (when the server ignores
/// `stream: false`) whose `response` fragments are concatenated.
pub fn parse_generation_body(body: &str) -> Result<GenerationResponse, ProviderError> {
    match serde_json::from_str::<GenerationResponse>(body) {
        Ok(response) => Ok(response),
        Err(e) => {
            let lines: Vec<serde_json::Value> = body
                .lines()
                .filter(|l| !l.trim().is_empty())
                .filter_map(|l| serde_json::from_str(l).ok())
                .collect();

            if lines.is_empty() {
                return Err(ProviderError::ParseError(format!(
                    "{}. Raw response (first 500 chars): {}",
                    e,
                    truncate(body, 500)
                )));
            }
            debug!("Parsing Ollama response as a stream of {} JSON objects", lines.len());

            let response: String = lines
                .iter()
                .filter_map(|v| v.get("response").and_then(|r| r.as_str()))
                .collect();
            let last = &lines[lines.len() - 1];

            Ok(GenerationResponse {
                model: last.get("model").and_then(|v| v.as_str()).unwrap_or("unknown").to_string(),
                response,
                done: lines.iter().any(|v| v.get("done").and_then(|d| d.as_bool()).unwrap_or(false)),
                prompt_eval_count: last.get("prompt_eval_count").and_then(|v| v.as_u64()),
                eval_count: last.get("eval_count").and_then(|v| v.as_u64()),
            })
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect()
    } else {
        text.to_string()
    }
}
