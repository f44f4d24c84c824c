/*!
 * Token-budgeted slicing.
 *
 * Sentences are packed greedily into slices whose estimated token count
 * stays within a budget. A sentence is never split; one that alone exceeds
 * the budget becomes an oversized slice of its own. Paragraph boundaries
 * inside a slice are rendered as a sentinel marker on its own line so the
 * translated slice can be split back into paragraphs.
 */

use std::ops::Range;

use log::{debug, warn};

use super::segmenter::Document;

/// Default paragraph-boundary sentinel
pub const DEFAULT_PARAGRAPH_MARKER: &str = "<段落分隔符>";

/// A fragment of one paragraph carried by a slice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePiece {
    /// Index of the paragraph in the document
    pub paragraph: usize,
    /// Range of the paragraph's sentences carried here; empty for a blank paragraph
    pub sentences: Range<usize>,
    /// Whether the first sentence of the paragraph is in this piece
    pub starts_paragraph: bool,
    /// Whether the last sentence of the paragraph is in this piece
    pub ends_paragraph: bool,
    /// Whitespace to restore after this piece when the paragraph continues in the next slice
    pub joint: String,
    /// Occurrences of the marker already present in the source text of this piece
    pub embedded_markers: usize,
}

impl SlicePiece {
    /// Blank paragraphs are restored from the source and never sent to the model
    pub fn is_passthrough(&self) -> bool {
        self.sentences.is_empty()
    }
}

/// A unit of work for the translation client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    /// Position in the plan, starting at 0
    pub index: usize,
    /// Paragraph fragments in document order
    pub pieces: Vec<SlicePiece>,
    /// Text sent to the model: piece texts joined by the marker line
    pub text: String,
    /// Sum of the estimated tokens of the carried sentences
    pub tokens: usize,
    /// Whether this slice is a single sentence larger than the budget
    pub oversized: bool,
}

impl Slice {
    /// Pieces rendered into `text`
    pub fn rendered_pieces(&self) -> impl Iterator<Item = &SlicePiece> {
        self.pieces.iter().filter(|p| !p.is_passthrough())
    }

    /// Number of markers in `text`, including any the source already contained
    pub fn marker_count(&self) -> usize {
        let embedded: usize = self.rendered_pieces().map(|p| p.embedded_markers).sum();
        self.rendered_pieces().count().saturating_sub(1) + embedded
    }

    /// Whether the slice has anything for the model to translate
    pub fn needs_translation(&self) -> bool {
        !self.text.is_empty()
    }

    /// Number of sentences carried
    pub fn sentence_count(&self) -> usize {
        self.pieces.iter().map(|p| p.sentences.len()).sum()
    }
}

/// Ordered slices for one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePlan {
    pub slices: Vec<Slice>,
    /// Marker the slice texts were rendered with
    pub marker: String,
    /// Budget the plan was built against
    pub budget: usize,
}

impl SlicePlan {
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Number of slices that require a request to the model
    pub fn translatable_count(&self) -> usize {
        self.slices.iter().filter(|s| s.needs_translation()).count()
    }
}

/// Greedy sentence packer
#[derive(Debug, Clone)]
pub struct Slicer {
    budget: usize,
    marker: String,
}

impl Slicer {
    /// Create a slicer. A zero budget is treated as 1.
    pub fn new(budget: usize, marker: impl Into<String>) -> Self {
        Self {
            budget: budget.max(1),
            marker: marker.into(),
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Partition the document into slices
    pub fn slice(&self, document: &Document) -> SlicePlan {
        let mut builder = PlanBuilder::new(document, &self.marker);

        for (p_idx, paragraph) in document.paragraphs.iter().enumerate() {
            if paragraph.is_blank() {
                builder.push_passthrough(p_idx);
                continue;
            }

            for (s_idx, sentence) in paragraph.sentences.iter().enumerate() {
                let cost = sentence.tokens;

                if cost > self.budget {
                    if builder.has_sentences() {
                        builder.flush(false);
                    }
                    builder.push_sentence(p_idx, s_idx, cost);
                    builder.flush(true);
                    continue;
                }

                // Inclusive: a sentence that lands exactly on the budget stays.
                if builder.running + cost > self.budget && builder.has_sentences() {
                    builder.flush(false);
                }
                builder.push_sentence(p_idx, s_idx, cost);
            }
        }
        builder.flush(false);

        let plan = SlicePlan {
            slices: builder.slices,
            marker: self.marker.clone(),
            budget: self.budget,
        };
        debug!(
            "Sliced {} paragraphs into {} slices (budget {} tokens, {} oversized)",
            document.paragraphs.len(),
            plan.len(),
            self.budget,
            plan.slices.iter().filter(|s| s.oversized).count()
        );
        plan
    }
}

/// Accumulator state while packing
struct PlanBuilder<'a> {
    document: &'a Document,
    marker: &'a str,
    slices: Vec<Slice>,
    pieces: Vec<SlicePiece>,
    running: usize,
}

impl<'a> PlanBuilder<'a> {
    fn new(document: &'a Document, marker: &'a str) -> Self {
        Self {
            document,
            marker,
            slices: Vec::new(),
            pieces: Vec::new(),
            running: 0,
        }
    }

    fn has_sentences(&self) -> bool {
        self.pieces.iter().any(|p| !p.is_passthrough())
    }

    fn push_passthrough(&mut self, paragraph: usize) {
        self.pieces.push(SlicePiece {
            paragraph,
            sentences: 0..0,
            starts_paragraph: true,
            ends_paragraph: true,
            joint: String::new(),
            embedded_markers: 0,
        });
    }

    fn push_sentence(&mut self, paragraph: usize, sentence: usize, cost: usize) {
        let total = self.document.paragraphs[paragraph].sentences.len();
        match self.pieces.last_mut() {
            Some(piece) if piece.paragraph == paragraph && !piece.is_passthrough() => {
                piece.sentences.end = sentence + 1;
                piece.ends_paragraph = sentence + 1 == total;
            }
            _ => self.pieces.push(SlicePiece {
                paragraph,
                sentences: sentence..sentence + 1,
                starts_paragraph: sentence == 0,
                ends_paragraph: sentence + 1 == total,
                joint: String::new(),
                embedded_markers: 0,
            }),
        }
        self.running += cost;
    }

    fn flush(&mut self, oversized: bool) {
        if self.pieces.is_empty() {
            return;
        }

        let mut pieces = std::mem::take(&mut self.pieces);
        let mut rendered = Vec::new();
        for piece in pieces.iter_mut().filter(|p| !p.is_passthrough()) {
            let raw: String = self.document.paragraphs[piece.paragraph].sentences[piece.sentences.clone()]
                .iter()
                .map(|s| s.text.as_str())
                .collect();
            let content = raw.trim_end();
            if !piece.ends_paragraph {
                piece.joint = raw[content.len()..].to_string();
            }
            piece.embedded_markers = content.matches(self.marker).count();
            if piece.embedded_markers > 0 {
                warn!(
                    "Paragraph {} already contains the marker {:?}; a translation that alters it will lose the paragraph layout",
                    piece.paragraph + 1,
                    self.marker
                );
            }
            rendered.push(content.to_string());
        }

        let separator = format!("\n{}\n", self.marker);
        self.slices.push(Slice {
            index: self.slices.len(),
            pieces,
            text: rendered.join(&separator),
            tokens: self.running,
            oversized,
        });
        self.running = 0;
    }
}
