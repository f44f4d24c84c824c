//! Token count estimation.
//!
//! Slicing only needs a cheap, deterministic approximation of how many
//! tokens a span will cost the model; the real tokenizer is never loaded.

use std::sync::Arc;

/// Estimates the number of tokens contained in a string.
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of tokens for the provided text.
    fn estimate_tokens(&self, text: &str) -> usize;
}

/// Counts UTF-8 bytes and divides by a fixed ratio, rounding down.
///
/// Four bytes per token is a reasonable figure for English text. CJK text
/// costs three bytes per character, so it is estimated at roughly one token
/// per character and a third.
///
/// Floor division keeps the estimate superadditive: for any split of a span
/// into `a` and `b`, `estimate(a) + estimate(b) <= estimate(a + b)`.
#[derive(Debug, Clone)]
pub struct ByteRatioEstimator {
    bytes_per_token: usize,
}

impl ByteRatioEstimator {
    /// Create an estimator that assumes the given number of bytes per token.
    pub fn new(bytes_per_token: usize) -> Self {
        Self {
            bytes_per_token: bytes_per_token.max(1),
        }
    }

    /// Configured byte-per-token ratio.
    pub fn bytes_per_token(&self) -> usize {
        self.bytes_per_token
    }
}

impl Default for ByteRatioEstimator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenEstimator for ByteRatioEstimator {
    fn estimate_tokens(&self, text: &str) -> usize {
        text.len() / self.bytes_per_token
    }
}

/// Shared token estimator handle.
pub type SharedTokenEstimator = Arc<dyn TokenEstimator>;
