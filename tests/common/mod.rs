/*!
 * Common test utilities for the slice-translator test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use slice_translator::app_config::Config;

// Local HTTP server speaking just enough of the Ollama API
pub mod fake_ollama;

/// Route library logs to the test output; safe to call from every test
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A short article with several paragraphs, markup and a blank-line run
pub fn sample_document() -> &'static str {
    "# Slicing long documents\n\
     \n\
     Large language models have a limited context window. Long inputs are therefore split into \
     smaller pieces before they are sent for translation. Each piece must end on a sentence boundary.\n\
     \n\
     \n\
     The <b>slicer</b> packs whole sentences greedily. It never splits a sentence. A sentence that is \
     larger than the budget is sent on its own!\n\
     \n\
     Does the structure survive? Paragraph markers make sure it does.\n"
}

/// Five one-sentence paragraphs of exactly five estimated tokens each
pub fn five_paragraphs() -> &'static str {
    "Sentence number one.\n\nSentence number two.\n\nSentence number three.\n\nSentence number four.\n\nSentence number five."
}

/// Configuration with fast retries and no connection probe
pub fn test_config(tokens_per_slice: usize) -> Config {
    let mut config = Config::default();
    config.translation.target_tokens_per_slice = tokens_per_slice;
    config.inference.retry_backoff_ms = 1;
    config.inference.max_backoff_ms = 5;
    config.general.skip_connection_test = true;
    config
}
