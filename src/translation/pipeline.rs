/*!
 * Document translation pipeline.
 *
 * Ties the slicing engine to a `SliceTranslator`: the input is decoded and
 * segmented, packed into slices, every slice that carries text is sent to the
 * translator, and the answers are reassembled into the output document.
 *
 * Slices may be translated concurrently; results are keyed by slice index so
 * completion order never leaks into the output.
 */

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::app_config::{Config, FailurePolicy};
use crate::errors::{ProviderError, ReassemblyMismatch, TranslationError};
use crate::text::{
    ByteRatioEstimator, Document, Reassembler, Segmenter, SlicePlan, Slicer, TranslatedSlice,
};
use super::client::SliceTranslator;

/// Shared flag used to stop a run early
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Requests already sent are allowed to finish.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options controlling a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// What to do when a slice cannot be translated
    pub failure_policy: FailurePolicy,
    /// Maximum number of slices in flight
    pub concurrent_requests: usize,
    /// Probe the endpoint after segmentation, before the first slice
    pub check_connection: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Abort,
            concurrent_requests: 1,
            check_connection: false,
        }
    }
}

/// Counters describing a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationStats {
    pub paragraphs: usize,
    pub sentences: usize,
    pub slices: usize,
    /// Requests made to the translator
    pub requests: usize,
    /// Slices holding one sentence larger than the budget
    pub oversized_slices: usize,
    /// Slices left untranslated under the keep-original policy
    pub kept_original: Vec<usize>,
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    /// The translated document
    pub text: String,
    /// Slices that fell back to single-paragraph reassembly
    pub mismatches: Vec<ReassemblyMismatch>,
    pub stats: TranslationStats,
}

enum SliceOutcome {
    Translated(String),
    Failed(ProviderError),
    Skipped,
}

/// Segment, slice, translate and reassemble documents
pub struct TranslationPipeline {
    segmenter: Segmenter,
    slicer: Slicer,
    translator: Arc<dyn SliceTranslator>,
    options: PipelineOptions,
    cancel: CancellationToken,
}

impl TranslationPipeline {
    pub fn new(
        segmenter: Segmenter,
        slicer: Slicer,
        translator: Arc<dyn SliceTranslator>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            segmenter,
            slicer,
            translator,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Build a pipeline from configuration around the given translator
    pub fn from_config(config: &Config, translator: Arc<dyn SliceTranslator>) -> Self {
        let translation = &config.translation;
        let estimator = Arc::new(ByteRatioEstimator::new(translation.bytes_per_token));
        Self::new(
            Segmenter::new(estimator),
            Slicer::new(translation.target_tokens_per_slice, translation.paragraph_separator.clone()),
            translator,
            PipelineOptions {
                failure_policy: translation.on_slice_failure,
                concurrent_requests: translation.concurrent_requests,
                check_connection: !config.general.skip_connection_test,
            },
        )
    }

    /// Use an externally controlled cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Segment and slice without translating
    pub fn plan(&self, text: &str) -> (Document, SlicePlan) {
        let document = self.segmenter.segment(text);
        let plan = self.slicer.slice(&document);
        (document, plan)
    }

    /// Translate raw file contents.
    ///
    /// Undecodable input fails before any request is made.
    pub async fn translate_bytes<F>(&self, bytes: &[u8], progress: F) -> Result<TranslationOutcome, TranslationError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let document = self.segmenter.segment_bytes(bytes)?;
        self.translate_document(&document, progress).await
    }

    /// Translate a text
    pub async fn translate_text<F>(&self, text: &str, progress: F) -> Result<TranslationOutcome, TranslationError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let document = self.segmenter.segment(text);
        self.translate_document(&document, progress).await
    }

    /// Translate an already segmented document
    pub async fn translate_document<F>(
        &self,
        document: &Document,
        progress: F,
    ) -> Result<TranslationOutcome, TranslationError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let plan = self.slicer.slice(document);
        let mut stats = TranslationStats {
            paragraphs: document.paragraphs.len(),
            sentences: document.sentence_count(),
            slices: plan.len(),
            oversized_slices: plan.slices.iter().filter(|s| s.oversized).count(),
            ..Default::default()
        };
        info!(
            "Document has {} paragraphs and {} sentences, packed into {} slices (budget {} tokens)",
            stats.paragraphs,
            stats.sentences,
            stats.slices,
            plan.budget
        );
        if stats.oversized_slices > 0 {
            warn!("{} sentence(s) exceed the slice budget and are sent alone", stats.oversized_slices);
        }

        if self.options.check_connection && plan.translatable_count() > 0 {
            self.translator
                .test_connection()
                .await
                .map_err(TranslationError::ConnectionCheck)?;
        }

        let translated = self.translate_plan(&plan, &mut stats, &progress).await?;
        let reassembled = Reassembler::new(document, &plan).reassemble(&translated);

        Ok(TranslationOutcome {
            text: reassembled.text,
            mismatches: reassembled.mismatches,
            stats,
        })
    }

    async fn translate_plan<F>(
        &self,
        plan: &SlicePlan,
        stats: &mut TranslationStats,
        progress: &F,
    ) -> Result<Vec<TranslatedSlice>, TranslationError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let total = plan.translatable_count();
        let finished = &AtomicUsize::new(0);
        let requests = &AtomicUsize::new(0);
        let stop = &AtomicBool::new(false);
        let abort_on_failure = self.options.failure_policy == FailurePolicy::Abort;

        let mut results: Vec<(usize, SliceOutcome)> = stream::iter(plan.slices.iter().filter(|s| s.needs_translation()))
            .map(|slice| async move {
                if self.cancel.is_cancelled() || stop.load(Ordering::SeqCst) {
                    return (slice.index, SliceOutcome::Skipped);
                }
                debug!(
                    "Translating slice {} ({} tokens, {} sentences)",
                    slice.index,
                    slice.tokens,
                    slice.sentence_count()
                );
                requests.fetch_add(1, Ordering::SeqCst);

                let outcome = match self.translator.translate(&slice.text).await {
                    Ok(text) => SliceOutcome::Translated(text),
                    Err(e) => {
                        if abort_on_failure {
                            stop.store(true, Ordering::SeqCst);
                        }
                        SliceOutcome::Failed(e)
                    }
                };

                let current = finished.fetch_add(1, Ordering::SeqCst) + 1;
                progress(current, total);
                (slice.index, outcome)
            })
            .buffer_unordered(self.options.concurrent_requests.max(1))
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        stats.requests = requests.load(Ordering::SeqCst);

        let mut translated = Vec::with_capacity(results.len());
        let mut skipped = false;
        for (index, outcome) in results {
            match outcome {
                SliceOutcome::Translated(text) => translated.push(TranslatedSlice::new(index, text)),
                SliceOutcome::Failed(source) if abort_on_failure => {
                    return Err(TranslationError::SliceFailed {
                        slice_index: index,
                        source,
                    });
                }
                SliceOutcome::Failed(source) => {
                    warn!("Keeping slice {} untranslated: {}", index, source);
                    stats.kept_original.push(index);
                }
                SliceOutcome::Skipped => skipped = true,
            }
        }

        if skipped {
            return Err(TranslationError::Cancelled {
                completed: finished.load(Ordering::SeqCst),
                total,
            });
        }

        Ok(translated)
    }
}
