use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::TranslationError;
use crate::translation::{CancellationToken, OllamaTranslator, SliceTranslator, TranslationPipeline};

/// Counts for a multi-file run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub translated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Main application controller for document translation
pub struct Controller {
    config: Config,
    translator: Arc<dyn SliceTranslator>,
    cancel: CancellationToken,
    show_progress: bool,
}

impl Controller {
    /// Create a controller talking to the configured Ollama endpoint
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        let translator = Arc::new(OllamaTranslator::from_config(&config));
        Ok(Self::with_translator(config, translator))
    }

    /// Create a controller around any translator, without a progress bar
    pub fn with_translator(config: Config, translator: Arc<dyn SliceTranslator>) -> Self {
        Self {
            config,
            translator,
            cancel: CancellationToken::new(),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Translate several files one after the other.
    ///
    /// A failing file is logged and counted; a cancelled run stops the loop.
    pub async fn run(&self, inputs: &[PathBuf], force_overwrite: bool) -> RunSummary {
        let start_time = Instant::now();
        let mut summary = RunSummary::default();

        for input in inputs {
            if self.cancel.is_cancelled() {
                warn!("Cancelled, {} file(s) not processed", inputs.len() - summary.translated - summary.skipped - summary.failed);
                break;
            }
            match self.translate_file(input, force_overwrite).await {
                Ok(Some(_)) => summary.translated += 1,
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    error!("{:#}", e);
                    if let Some(hint) = e.downcast_ref::<TranslationError>().and_then(TranslationError::hint) {
                        info!("{}", hint);
                    }
                    summary.failed += 1;
                }
            }
        }

        if inputs.len() > 1 {
            info!(
                "Processed {} file(s) in {}: {} translated, {} skipped, {} failed",
                inputs.len(),
                Self::format_duration(start_time.elapsed()),
                summary.translated,
                summary.skipped,
                summary.failed
            );
        }
        summary
    }

    /// Translate one file next to itself.
    ///
    /// Returns the output path, or `None` when the output already exists and
    /// `force_overwrite` is off. Nothing is written unless the whole document
    /// was translated.
    pub async fn translate_file(&self, input_file: &Path, force_overwrite: bool) -> Result<Option<PathBuf>> {
        let start_time = Instant::now();

        if !input_file.is_file() {
            return Err(anyhow!("Input file does not exist: {}", input_file.display()));
        }

        let output_path = output_path_for(input_file);
        if output_path.exists() && !force_overwrite {
            warn!(
                "Skipping {}, {} already exists (use -f to force overwrite)",
                input_file.display(),
                output_path.display()
            );
            return Ok(None);
        }

        info!("Translating {} into {}", input_file.display(), self.config.translation.target_language);
        let bytes = tokio::fs::read(input_file)
            .await
            .with_context(|| format!("Failed to read input file: {}", input_file.display()))?;

        let pipeline = TranslationPipeline::from_config(&self.config, Arc::clone(&self.translator))
            .with_cancellation(self.cancel.clone());

        let progress_bar = self.progress_bar();
        let bar = progress_bar.clone();
        let result = pipeline
            .translate_bytes(&bytes, move |done, total| {
                bar.set_length(total as u64);
                bar.set_position(done as u64);
            })
            .await;

        let outcome = match result {
            Ok(outcome) => {
                progress_bar.finish_and_clear();
                outcome
            }
            Err(e) => {
                progress_bar.abandon();
                return Err(e).with_context(|| format!("Failed to translate {}", input_file.display()));
            }
        };

        write_atomically(&output_path, &outcome.text)?;

        if !outcome.mismatches.is_empty() {
            warn!(
                "{} slice(s) lost paragraph markers and were merged into single paragraphs",
                outcome.mismatches.len()
            );
        }
        if !outcome.stats.kept_original.is_empty() {
            warn!(
                "{} slice(s) were left untranslated: {:?}",
                outcome.stats.kept_original.len(),
                outcome.stats.kept_original
            );
        }
        info!(
            "Success: {} ({} slices, {} requests, {})",
            output_path.display(),
            outcome.stats.slices,
            outcome.stats.requests,
            Self::format_duration(start_time.elapsed())
        );

        Ok(Some(output_path))
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress_bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} slices ({percent}%) {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// `dir/name.ext` becomes `dir/name-translated.ext`
pub fn output_path_for(input_file: &Path) -> PathBuf {
    let stem = input_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match input_file.extension() {
        Some(ext) => format!("{}-translated.{}", stem, ext.to_string_lossy()),
        None => format!("{}-translated", stem),
    };
    input_file.with_file_name(file_name)
}

/// Write through a temporary file in the target directory, then rename
pub(crate) fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.flush().with_context(|| format!("Failed to write {}", path.display()))?;
    file.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
