/*!
 * Document slicing engine.
 *
 * - `tokens`: token count estimation
 * - `segmenter`: paragraph and sentence segmentation
 * - `slicer`: token-budgeted slice packing
 * - `reassembler`: rebuilding a document from translated slices
 */

pub mod reassembler;
pub mod segmenter;
pub mod slicer;
pub mod tokens;

pub use self::reassembler::{Reassembled, Reassembler, TranslatedSlice};
pub use self::segmenter::{Document, LineEnding, Paragraph, Segmenter, Sentence};
pub use self::slicer::{Slice, SlicePiece, SlicePlan, Slicer, DEFAULT_PARAGRAPH_MARKER};
pub use self::tokens::{ByteRatioEstimator, SharedTokenEstimator, TokenEstimator};
