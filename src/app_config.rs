use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;
use std::time::Duration;

use crate::app_controller::write_atomically;
use crate::errors::ConfigError;
use crate::translation::retry::RetryPolicy;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    /// Inference endpoint settings
    #[serde(default, alias = "ollama")]
    pub inference: InferenceConfig,

    /// Slicing and prompt settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Run-wide settings
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Settings for the Ollama generate endpoint
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InferenceConfig {
    /// Full URL of the generate endpoint
    #[serde(default = "default_url")]
    pub url: String,

    /// Model name
    #[serde(default = "default_model_name")]
    pub model_name: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,

    /// Attempts per slice, the first one included
    #[serde(default = "default_retry_count")]
    pub retries: u32,

    /// Delay after the first failed attempt in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound for a single retry delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

/// Settings for slicing and prompting
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslationConfig {
    /// Token budget per slice
    #[serde(default = "default_target_tokens_per_slice")]
    pub target_tokens_per_slice: usize,

    /// Language the model is asked to produce
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// System prompt template; `{target_language}` is substituted
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Sentinel line placed between paragraphs inside a slice
    #[serde(default = "default_paragraph_separator", alias = "para_sep")]
    pub paragraph_separator: String,

    /// UTF-8 bytes counted as one token
    #[serde(default = "default_bytes_per_token")]
    pub bytes_per_token: usize,

    #[serde(default)]
    pub on_slice_failure: FailurePolicy,

    /// Slices translated at the same time
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct GeneralConfig {
    /// Skip the startup request that checks the endpoint
    #[serde(default)]
    pub skip_connection_test: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Request timeout in seconds; overrides `inference.timeout` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Attempts per slice; overrides `inference.retries` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

const TOP_LEVEL_KEYS: &[&str] = &["inference", "ollama", "translation", "general"];

const INFERENCE_KEYS: &[&str] = &[
    "url",
    "model_name",
    "temperature",
    "top_p",
    "repeat_penalty",
    "timeout",
    "retries",
    "retry_backoff_ms",
    "max_backoff_ms",
];

const TRANSLATION_KEYS: &[&str] = &[
    "target_tokens_per_slice",
    "target_language",
    "system_prompt",
    "paragraph_separator",
    "para_sep",
    "bytes_per_token",
    "on_slice_failure",
    "concurrent_requests",
];

const GENERAL_KEYS: &[&str] = &["skip_connection_test", "log_level", "timeout", "retries"];

/// What to do with a slice that still fails after retries
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the document and report the slice
    #[default]
    Abort,
    /// Keep the source text of the slice and continue
    KeepOriginal,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_url() -> String {
    "http://localhost:11434/api/generate".to_string()
}

fn default_model_name() -> String {
    "gemma3:latest".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_top_p() -> f32 {
    0.9
}

fn default_repeat_penalty() -> f32 {
    1.2
}

fn default_timeout_secs() -> u64 {
    240
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    2000
}

fn default_max_backoff_ms() -> u64 {
    30000
}

fn default_target_tokens_per_slice() -> usize {
    1024
}

fn default_target_language() -> String {
    "simplified Chinese".to_string()
}

fn default_system_prompt() -> String {
    "You are a professional translator. Translate the following text into natural, fluent {target_language} \
     if it's not already in {target_language}. DO NOT translate or remove any formating tags, including \
     HTML/markdown/latex tags such as <table>, <figure>, <equation>, <reference>, etc. DO NOT translate \
     people names, acronyms, equations, hyperlinks, or references. Return ONLY the {target_language} \
     translation, do not include any thinking/reasoning, explanation or note."
        .to_string()
}

fn default_paragraph_separator() -> String {
    crate::text::DEFAULT_PARAGRAPH_MARKER.to_string()
}

fn default_bytes_per_token() -> usize {
    4
}

fn default_concurrent_requests() -> usize {
    1
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            model_name: default_model_name(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            repeat_penalty: default_repeat_penalty(),
            timeout: default_timeout_secs(),
            retries: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            target_tokens_per_slice: default_target_tokens_per_slice(),
            target_language: default_target_language(),
            system_prompt: default_system_prompt(),
            paragraph_separator: default_paragraph_separator(),
            bytes_per_token: default_bytes_per_token(),
            on_slice_failure: FailurePolicy::default(),
            concurrent_requests: default_concurrent_requests(),
        }
    }
}

impl Config {
    /// Load the configuration file, falling back to defaults.
    ///
    /// A missing or unparsable file is not an error: a warning is logged and
    /// the built-in defaults are used. Values are not validated here.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if path.exists() {
                    warn!("Could not read config file '{}' ({:#}), using defaults", path.display(), e);
                } else {
                    warn!("Config file '{}' not found, using defaults", path.display());
                }
                Self::default()
            }
        }
    }

    /// Load the configuration file.
    ///
    /// Unknown keys are reported with a warning. `general.timeout` and
    /// `general.retries` take precedence over the inference section.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration JSON
    pub fn from_json(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        for key in unknown_keys(&value) {
            warn!("Ignoring unknown config key '{}'", key);
        }

        let mut config: Config = serde_json::from_value(value)?;
        if let Some(timeout) = config.general.timeout {
            config.inference.timeout = timeout;
        }
        if let Some(retries) = config.general.retries {
            config.inference.retries = retries;
        }
        Ok(config)
    }

    /// Write the configuration as pretty JSON, replacing the file atomically
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        write_atomically(path.as_ref(), &json)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let inference = &self.inference;

        let url = url::Url::parse(&inference.url).map_err(|e| invalid("inference.url", e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid("inference.url", format!("unsupported scheme '{}'", url.scheme())));
        }
        if inference.model_name.trim().is_empty() {
            return Err(invalid("inference.model_name", "must not be empty"));
        }
        if !(0.0..=2.0).contains(&inference.temperature) {
            return Err(invalid("inference.temperature", "must be between 0 and 2"));
        }
        if !(inference.top_p > 0.0 && inference.top_p <= 1.0) {
            return Err(invalid("inference.top_p", "must be in (0, 1]"));
        }
        if inference.repeat_penalty <= 0.0 {
            return Err(invalid("inference.repeat_penalty", "must be positive"));
        }
        if inference.timeout == 0 {
            return Err(invalid("inference.timeout", "must be at least 1 second"));
        }
        if inference.retries == 0 {
            return Err(invalid("inference.retries", "must be at least 1"));
        }
        if inference.max_backoff_ms < inference.retry_backoff_ms {
            return Err(invalid("inference.max_backoff_ms", "must not be smaller than retry_backoff_ms"));
        }

        let translation = &self.translation;
        if translation.target_tokens_per_slice == 0 {
            return Err(invalid("translation.target_tokens_per_slice", "must be at least 1"));
        }
        if translation.target_language.trim().is_empty() {
            return Err(invalid("translation.target_language", "must not be empty"));
        }
        if translation.paragraph_separator.trim().is_empty() {
            return Err(invalid("translation.paragraph_separator", "must contain visible characters"));
        }
        if translation.bytes_per_token == 0 {
            return Err(invalid("translation.bytes_per_token", "must be at least 1"));
        }
        if translation.concurrent_requests == 0 {
            return Err(invalid("translation.concurrent_requests", "must be at least 1"));
        }

        Ok(())
    }

    /// System prompt with the target language filled in
    pub fn system_prompt(&self) -> String {
        self.translation
            .system_prompt
            .replace("{target_language}", &self.translation.target_language)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.inference.retries,
            Duration::from_millis(self.inference.retry_backoff_ms),
            Duration::from_millis(self.inference.max_backoff_ms),
        )
    }
}

/// Dotted paths of keys that no config field reads
fn unknown_keys(value: &serde_json::Value) -> Vec<String> {
    let Some(root) = value.as_object() else {
        return Vec::new();
    };

    let mut unknown = Vec::new();
    for (key, section) in root {
        let known = match key.as_str() {
            "inference" | "ollama" => INFERENCE_KEYS,
            "translation" => TRANSLATION_KEYS,
            "general" => GENERAL_KEYS,
            _ => {
                if !TOP_LEVEL_KEYS.contains(&key.as_str()) {
                    unknown.push(key.clone());
                }
                continue;
            }
        };
        if let Some(fields) = section.as_object() {
            unknown.extend(
                fields
                    .keys()
                    .filter(|field| !known.contains(&field.as_str()))
                    .map(|field| format!("{}.{}", key, field)),
            );
        }
    }
    unknown
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}
