/*!
 * # slice-translator
 *
 * A Rust library for translating long text documents with a local LLM.
 *
 * ## Features
 *
 * - Paragraph and sentence segmentation (UAX #29 sentence boundaries)
 * - Greedy packing of whole sentences into token-budgeted slices
 * - Paragraph markers inside slices so structure survives translation
 * - Ollama client with exponential backoff retry
 * - Faithful reassembly of the original whitespace and line endings
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `text`: The slicing engine:
 *   - `text::tokens`: Token estimation
 *   - `text::segmenter`: Paragraph and sentence segmentation
 *   - `text::slicer`: Token-budgeted slices
 *   - `text::reassembler`: Rebuilding the translated document
 * - `translation`: Retry policy, translation client and document pipeline
 * - `providers`: Client implementations for inference services:
 *   - `providers::ollama`: Ollama API client
 *   - `providers::mock`: Scripted translator for tests
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod providers;
pub mod text;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use errors::{ConfigError, ProviderError, SegmentationError, TranslationError};
pub use text::{Reassembler, Segmenter, Slicer};
pub use translation::{SliceTranslator, TranslationPipeline};
