/*!
 * Paragraph and sentence segmentation.
 *
 * A document is split into paragraphs on blank lines, and every paragraph
 * into sentences using Unicode sentence boundaries (UAX #29). Boundaries that
 * UAX #29 places after a known abbreviation or an initial are merged back
 * unless the next word clearly starts a new sentence. Everything the
 * split removes (whitespace around a paragraph, the blank lines between
 * paragraphs, spacing between sentences) is captured so that the document can
 * be rebuilt byte for byte.
 */

use std::collections::HashSet;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::errors::SegmentationError;
use super::tokens::{ByteRatioEstimator, SharedTokenEstimator};

/// A line break, optional horizontal whitespace, and another line break
static PARAGRAPH_BREAK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n[^\S\n]*\n").expect("Invalid paragraph break regex")
});

/// Abbreviations that are never the last word of a sentence
static PREFIX_ABBREVIATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "dr", "mr", "mrs", "ms", "prof", "st", "mt", "rev", "gen", "col", "capt", "lt", "sgt",
        "hon", "e.g", "i.e", "cf", "vs", "viz", "fig", "approx", "vol", "pp",
    ]
    .into_iter()
    .collect()
});

/// Abbreviations that end a sentence only when a sentence starter follows
static ABBREVIATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "etc", "inc", "ltd", "co", "corp", "jr", "sr", "al", "a.m", "p.m", "u.s", "u.k", "jan",
        "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec", "ph.d",
    ]
    .into_iter()
    .collect()
});

/// Words that begin a new sentence after an ambiguous abbreviation
static SENTENCE_STARTERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "he", "she", "it", "they", "we", "i", "you", "this", "that", "these",
        "those", "then", "there", "however", "but", "so", "his", "her", "their", "our", "my",
        "in", "after", "when", "if", "what", "why", "how",
    ]
    .into_iter()
    .collect()
});

const BOM: char = '\u{feff}';

/// Line ending convention of the source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

/// Atomic unit of translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Sentence text, including the whitespace that follows it inside the paragraph
    pub text: String,
    /// Estimated token cost
    pub tokens: usize,
}

/// A paragraph and the whitespace that surrounds it in the source
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Paragraph {
    /// Whitespace before the first sentence
    pub leading: String,
    /// Sentences in order; empty for a blank paragraph
    pub sentences: Vec<Sentence>,
    /// Whitespace after the last sentence
    pub trailing: String,
    /// Blank-line separator following this paragraph (empty for the last one)
    pub separator: String,
}

impl Paragraph {
    /// Whether the paragraph carries no text
    pub fn is_blank(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Paragraph text without surrounding whitespace
    pub fn body(&self) -> String {
        self.sentences.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Segmented document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub paragraphs: Vec<Paragraph>,
    pub line_ending: LineEnding,
    /// Whether the source started with a UTF-8 byte order mark
    pub bom: bool,
}

impl Document {
    /// Whether the document has no paragraphs at all
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Number of sentences across all paragraphs
    pub fn sentence_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.sentences.len()).sum()
    }

    /// Restore line endings and the byte order mark on text rendered with `\n`
    pub fn finish_output(&self, mut text: String) -> String {
        if self.line_ending == LineEnding::CrLf {
            text = text.replace('\n', "\r\n");
        }
        if self.bom {
            text.insert(0, BOM);
        }
        text
    }

    /// Rebuild the source text from the captured segments
    pub fn render(&self) -> String {
        let mut out = String::new();
        for paragraph in &self.paragraphs {
            out.push_str(&paragraph.leading);
            for sentence in &paragraph.sentences {
                out.push_str(&sentence.text);
            }
            out.push_str(&paragraph.trailing);
            out.push_str(&paragraph.separator);
        }
        self.finish_output(out)
    }
}

/// Splits text into paragraphs and sentences
#[derive(Clone)]
pub struct Segmenter {
    estimator: SharedTokenEstimator,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(std::sync::Arc::new(ByteRatioEstimator::default()))
    }
}

impl Segmenter {
    /// Create a segmenter that costs sentences with the given estimator
    pub fn new(estimator: SharedTokenEstimator) -> Self {
        Self { estimator }
    }

    /// Decode raw bytes as UTF-8 and segment them
    pub fn segment_bytes(&self, bytes: &[u8]) -> Result<Document, SegmentationError> {
        let text = std::str::from_utf8(bytes).map_err(|e| SegmentationError::InvalidUtf8 {
            valid_up_to: e.valid_up_to(),
        })?;
        Ok(self.segment(text))
    }

    /// Segment decoded text. Never fails.
    pub fn segment(&self, text: &str) -> Document {
        let (text, bom) = match text.strip_prefix(BOM) {
            Some(rest) => (rest, true),
            None => (text, false),
        };

        // Mixed line endings are normalized to whichever convention is used
        // for the first line break.
        let line_ending = match text.find('\n') {
            Some(pos) if pos > 0 && text.as_bytes()[pos - 1] == b'\r' => LineEnding::CrLf,
            _ => LineEnding::Lf,
        };
        let normalized;
        let text = if line_ending == LineEnding::CrLf {
            normalized = text.replace("\r\n", "\n");
            normalized.as_str()
        } else {
            text
        };

        let mut document = Document {
            paragraphs: Vec::new(),
            line_ending,
            bom,
        };
        if text.is_empty() {
            return document;
        }

        let mut start = 0;
        for found in PARAGRAPH_BREAK_REGEX.find_iter(text) {
            document
                .paragraphs
                .push(self.build_paragraph(&text[start..found.start()], found.as_str()));
            start = found.end();
        }
        document.paragraphs.push(self.build_paragraph(&text[start..], ""));

        debug!(
            "Segmented {} bytes into {} paragraphs and {} sentences",
            text.len(),
            document.paragraphs.len(),
            document.sentence_count()
        );

        document
    }

    fn build_paragraph(&self, raw: &str, separator: &str) -> Paragraph {
        let body = raw.trim();
        if body.is_empty() {
            return Paragraph {
                leading: raw.to_string(),
                sentences: Vec::new(),
                trailing: String::new(),
                separator: separator.to_string(),
            };
        }

        let leading_len = raw.len() - raw.trim_start().len();
        let trailing_start = leading_len + body.len();

        Paragraph {
            leading: raw[..leading_len].to_string(),
            sentences: split_sentences(body)
                .into_iter()
                .map(|text| Sentence {
                    tokens: self.estimator.estimate_tokens(text),
                    text: text.to_string(),
                })
                .collect(),
            trailing: raw[trailing_start..].to_string(),
            separator: separator.to_string(),
        }
    }
}

/// Split a trimmed paragraph body into sentences.
///
/// Whitespace between two sentences always ends up at the tail of the first
/// one, so every sentence starts with a non-whitespace character and the
/// pieces concatenate back to `body`.
fn split_sentences(body: &str) -> Vec<&str> {
    let mut starts = vec![0];
    let mut last = 0;
    for (offset, _) in body.split_sentence_bound_indices().skip(1) {
        let rest = &body[offset..];
        let adjusted = offset + (rest.len() - rest.trim_start().len());
        if adjusted > last && adjusted < body.len() && !continues_sentence(&body[..adjusted], &body[adjusted..]) {
            starts.push(adjusted);
            last = adjusted;
        }
    }

    starts
        .iter()
        .zip(starts.iter().skip(1).copied().chain(std::iter::once(body.len())))
        .map(|(&from, to)| &body[from..to])
        .collect()
}

/// Whether a boundary between `before` and `after` falls inside a sentence
/// because `before` ends with an abbreviation or an initial
fn continues_sentence(before: &str, after: &str) -> bool {
    let Some(word) = before.trim_end().strip_suffix('.') else {
        return false;
    };
    let word = word
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    if word.is_empty() {
        return false;
    }
    if PREFIX_ABBREVIATIONS.contains(word.as_str()) {
        return true;
    }

    let is_initial = word.chars().count() == 1 && word.chars().all(char::is_alphabetic);
    if !is_initial && !ABBREVIATIONS.contains(word.as_str()) {
        return false;
    }
    let next = after
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or_default()
        .to_lowercase();
    !SENTENCE_STARTERS.contains(next.as_str())
}
