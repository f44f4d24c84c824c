/*!
 * Reassembly of translated slices.
 *
 * Each translated slice is split on the paragraph marker and every part is
 * put back in the place of the paragraph fragment it was rendered from,
 * surrounded by the whitespace captured during segmentation. When the model
 * did not keep the markers intact the whole slice becomes one paragraph.
 */

use std::ops::Range;

use log::warn;

use crate::errors::ReassemblyMismatch;
use super::segmenter::Document;
use super::slicer::{Slice, SlicePiece, SlicePlan};

/// Translated text for one slice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedSlice {
    pub index: usize,
    pub text: String,
}

impl TranslatedSlice {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// Result of reassembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassembled {
    /// The output document
    pub text: String,
    /// Slices whose marker count did not match the source
    pub mismatches: Vec<ReassemblyMismatch>,
}

/// Rebuilds a document from translated slices
pub struct Reassembler<'a> {
    document: &'a Document,
    plan: &'a SlicePlan,
}

impl<'a> Reassembler<'a> {
    pub fn new(document: &'a Document, plan: &'a SlicePlan) -> Self {
        Self { document, plan }
    }

    /// Rebuild the document.
    ///
    /// `translated` may be in any order; it is matched to the plan by slice
    /// index. A slice with no translation keeps its source text.
    pub fn reassemble(&self, translated: &[TranslatedSlice]) -> Reassembled {
        let mut by_index: Vec<Option<&str>> = vec![None; self.plan.len()];
        for slice in translated {
            if let Some(slot) = by_index.get_mut(slice.index) {
                *slot = Some(slice.text.as_str());
            }
        }

        let mut out = String::new();
        let mut mismatches = Vec::new();

        for (slice, text) in self.plan.slices.iter().zip(by_index) {
            let text = text.unwrap_or(slice.text.as_str());
            if let Some(mismatch) = self.write_slice(&mut out, slice, text) {
                warn!(
                    "Paragraph markers lost in translation ({}); keeping the slice as one paragraph",
                    mismatch
                );
                mismatches.push(mismatch);
            }
        }

        Reassembled {
            text: self.document.finish_output(out),
            mismatches,
        }
    }

    fn write_slice(&self, out: &mut String, slice: &Slice, text: &str) -> Option<ReassemblyMismatch> {
        let ranges = split_ranges(text, &self.plan.marker);
        let expected = slice.marker_count() + 1;

        if ranges.len() == expected || slice.rendered_pieces().count() == 0 {
            let mut ranges = ranges.into_iter();
            for piece in &slice.pieces {
                if piece.is_passthrough() {
                    self.write_passthrough(out, piece);
                    continue;
                }
                // A piece whose source held the marker spans that many extra parts
                let mut span = ranges.by_ref().take(piece.embedded_markers + 1);
                let part = match (span.next(), span.last()) {
                    (Some(first), Some(last)) => text[first.start..last.end].trim(),
                    (Some(only), None) => text[only].trim(),
                    _ => "",
                };
                self.write_piece(out, piece, part);
            }
            return None;
        }

        let parts: Vec<&str> = ranges.into_iter().map(|r| text[r].trim()).collect();

        // Fallback: everything between the first and the last rendered piece
        // becomes a single paragraph.
        let merged = parts
            .iter()
            .filter(|p| !p.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        let rendered: Vec<&SlicePiece> = slice.rendered_pieces().collect();
        let (first, last) = match (rendered.first(), rendered.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return None,
        };

        for piece in slice.pieces.iter().take_while(|p| p.is_passthrough()) {
            self.write_passthrough(out, piece);
        }
        if first.starts_paragraph {
            out.push_str(&self.document.paragraphs[first.paragraph].leading);
        }
        out.push_str(&merged);
        self.write_piece_end(out, last);
        for piece in slice.pieces.iter().rev().take_while(|p| p.is_passthrough()).collect::<Vec<_>>().into_iter().rev() {
            self.write_passthrough(out, piece);
        }

        Some(ReassemblyMismatch {
            slice_index: slice.index,
            expected_markers: slice.marker_count(),
            found_markers: parts.len() - 1,
        })
    }

    fn write_passthrough(&self, out: &mut String, piece: &SlicePiece) {
        let paragraph = &self.document.paragraphs[piece.paragraph];
        out.push_str(&paragraph.leading);
        out.push_str(&paragraph.trailing);
        out.push_str(&paragraph.separator);
    }

    fn write_piece(&self, out: &mut String, piece: &SlicePiece, text: &str) {
        if piece.starts_paragraph {
            out.push_str(&self.document.paragraphs[piece.paragraph].leading);
        }
        out.push_str(text);
        self.write_piece_end(out, piece);
    }

    fn write_piece_end(&self, out: &mut String, piece: &SlicePiece) {
        if piece.ends_paragraph {
            let paragraph = &self.document.paragraphs[piece.paragraph];
            out.push_str(&paragraph.trailing);
            out.push_str(&paragraph.separator);
        } else {
            out.push_str(&piece.joint);
        }
    }
}

/// Byte ranges of the parts of `text` between occurrences of `marker`
fn split_ranges(text: &str, marker: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(marker) {
        ranges.push(start..pos);
        start = pos + marker.len();
    }
    ranges.push(start..text.len());
    ranges
}

/// Identity translation of every slice, mostly useful for dry runs
pub fn untranslated(plan: &SlicePlan) -> Vec<TranslatedSlice> {
    plan.slices
        .iter()
        .map(|s| TranslatedSlice::new(s.index, s.text.clone()))
        .collect()
}
