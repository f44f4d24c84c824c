/*!
 * Error types for the slice-translator application.
 *
 * This module contains custom error types for the different stages of a run
 * (decoding, inference requests, translation, configuration), using the
 * thiserror crate for ergonomic error definitions.
 */

use std::fmt;
use thiserror::Error;

/// Errors that can occur when talking to the inference endpoint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    TimeoutError(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),
}

/// Failure families surfaced at the translation boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Connection,
    Api,
    Timeout,
}

impl ProviderError {
    /// Family of this failure
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ConnectionError(_) => FailureKind::Connection,
            Self::ApiError { .. } | Self::ParseError(_) => FailureKind::Api,
            Self::TimeoutError(_) => FailureKind::Timeout,
        }
    }

    /// Whether repeating the same request could succeed.
    ///
    /// Client errors other than 408 (request timeout) and 429 (too many
    /// requests) are deterministic and are not retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError { status_code, .. } => {
                !(400..500).contains(status_code) || *status_code == 408 || *status_code == 429
            }
            _ => true,
        }
    }
}

/// Errors that can occur while decoding and segmenting input text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmentationError {
    /// The input bytes are not valid UTF-8
    #[error("Input is not valid UTF-8 (first invalid byte at offset {valid_up_to})")]
    InvalidUtf8 {
        /// Length of the longest valid prefix
        valid_up_to: usize,
    },
}

/// Errors that can occur during translation of a document
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Input could not be segmented
    #[error("Segmentation error: {0}")]
    Segmentation(#[from] SegmentationError),

    /// A slice could not be translated after the retry policy gave up
    #[error("Translation of slice {slice_index} failed: {source}")]
    SliceFailed {
        /// Index of the slice that failed
        slice_index: usize,
        /// Last error reported by the client
        #[source]
        source: ProviderError,
    },

    /// The startup connectivity probe failed
    #[error("Cannot reach the inference endpoint: {0}")]
    ConnectionCheck(#[source] ProviderError),

    /// The run was cancelled before every slice was translated
    #[error("Translation cancelled after {completed} of {total} slices")]
    Cancelled {
        /// Slices finished before cancellation took effect
        completed: usize,
        /// Slices in the plan
        total: usize,
    },
}

impl TranslationError {
    /// Index of the failing slice, if the error is tied to one
    pub fn slice_index(&self) -> Option<usize> {
        match self {
            Self::SliceFailed { slice_index, .. } => Some(*slice_index),
            _ => None,
        }
    }

    /// What the user can do about a failed connection check
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConnectionCheck(ProviderError::ConnectionError(_) | ProviderError::TimeoutError(_)) => {
                Some("Is the Ollama service running? Start it with `ollama serve` and try again")
            }
            Self::ConnectionCheck(ProviderError::ApiError { status_code: 404, .. }) => {
                Some("The model may not be installed; download it with `ollama pull <model>`")
            }
            _ => None,
        }
    }
}

/// Errors raised while validating configuration values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
}

/// Marker-count mismatch in a translated slice.
///
/// This is a diagnostic, never an error: the reassembler falls back to
/// treating the whole slice as one paragraph and keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassemblyMismatch {
    /// Index of the affected slice
    pub slice_index: usize,
    /// Markers present in the source slice
    pub expected_markers: usize,
    /// Markers found in the translation
    pub found_markers: usize,
}

impl fmt::Display for ReassemblyMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slice {} returned {} paragraph marker(s), expected {}",
            self.slice_index, self.found_markers, self.expected_markers
        )
    }
}
