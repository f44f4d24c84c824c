/*!
 * Mock translator for testing.
 *
 * This module provides a scripted translator that simulates different
 * behaviors of an inference endpoint:
 * - `MockTranslator::identity()` - returns the slice text unchanged
 * - `MockTranslator::prefixing(..)` - prefixes every paragraph fragment
 * - `MockTranslator::dropping_markers()` - loses the paragraph markers
 * - `MockTranslator::failing_at(..)` - fails on one specific call
 * - `MockTranslator::failing()` - always fails with an error
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::text::DEFAULT_PARAGRAPH_MARKER;
use crate::translation::client::SliceTranslator;

/// Behavior mode for the mock translator
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Echo the input
    Identity,
    /// Prefix every marker-separated part with the given text
    Prefix(String),
    /// Remove the paragraph markers, joining the parts with a space
    DropMarkers,
    /// Fail the n-th call (0-based) with the given error, echo otherwise
    FailAt { call: usize, error: ProviderError },
    /// Fail every call whose text contains the needle, echo otherwise
    FailContaining { needle: String, error: ProviderError },
    /// Always fail
    Failing,
    /// Echo after a delay
    Slow { delay_ms: u64 },
}

/// Mock translator recording every request it receives
#[derive(Debug, Clone)]
pub struct MockTranslator {
    behavior: MockBehavior,
    marker: String,
    call_count: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
    connection_ok: bool,
}

impl MockTranslator {
    /// Create a new mock translator with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            marker: DEFAULT_PARAGRAPH_MARKER.to_string(),
            call_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            connection_ok: true,
        }
    }

    pub fn identity() -> Self {
        Self::new(MockBehavior::Identity)
    }

    pub fn prefixing(prefix: impl Into<String>) -> Self {
        Self::new(MockBehavior::Prefix(prefix.into()))
    }

    pub fn dropping_markers() -> Self {
        Self::new(MockBehavior::DropMarkers)
    }

    pub fn failing_at(call: usize, error: ProviderError) -> Self {
        Self::new(MockBehavior::FailAt { call, error })
    }

    pub fn failing_containing(needle: impl Into<String>, error: ProviderError) -> Self {
        Self::new(MockBehavior::FailContaining {
            needle: needle.into(),
            error,
        })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Use a different paragraph marker
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Make `test_connection` fail
    pub fn unreachable(mut self) -> Self {
        self.connection_ok = false;
        self
    }

    /// Number of `translate` calls made so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Texts received so far, in call order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    fn prefix_parts(&self, text: &str, prefix: &str) -> String {
        text.split(self.marker.as_str())
            .map(|part| format!("{}{}", prefix, part.trim()))
            .collect::<Vec<_>>()
            .join(&format!("\n{}\n", self.marker))
    }
}

#[async_trait]
impl SliceTranslator for MockTranslator {
    async fn translate(&self, text: &str) -> Result<String, ProviderError> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(text.to_string());

        match &self.behavior {
            MockBehavior::Identity => Ok(text.to_string()),
            MockBehavior::Prefix(prefix) => Ok(self.prefix_parts(text, prefix)),
            MockBehavior::DropMarkers => Ok(text
                .split(self.marker.as_str())
                .map(str::trim)
                .collect::<Vec<_>>()
                .join(" ")),
            MockBehavior::FailAt { call: failing, error } => {
                if call == *failing {
                    Err(error.clone())
                } else {
                    Ok(text.to_string())
                }
            }
            MockBehavior::FailContaining { needle, error } => {
                if text.contains(needle.as_str()) {
                    Err(error.clone())
                } else {
                    Ok(text.to_string())
                }
            }
            MockBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated provider failure".to_string(),
            }),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(text.to_string())
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        if self.connection_ok {
            Ok(())
        } else {
            Err(ProviderError::ConnectionError("Simulated unreachable endpoint".to_string()))
        }
    }
}
