/*!
 * Translation of sliced documents.
 *
 * - `retry`: exponential backoff policy for inference requests
 * - `client`: the `SliceTranslator` boundary and its Ollama implementation
 * - `pipeline`: segmentation, slicing, translation and reassembly of a document
 */

// Re-export main types for easier usage
pub use self::client::{OllamaTranslator, SliceTranslator};
pub use self::pipeline::{
    CancellationToken, PipelineOptions, TranslationOutcome, TranslationPipeline, TranslationStats,
};
pub use self::retry::RetryPolicy;

// Submodules
pub mod client;
pub mod pipeline;
pub mod retry;
