/*!
 * Property-based tests for the slicing engine
 */

use proptest::prelude::*;

use slice_translator::text::{
    reassembler::untranslated, Reassembler, Segmenter, Slicer, DEFAULT_PARAGRAPH_MARKER,
};

/// Prose-like text: words, sentence punctuation, spaces, tabs and line breaks
fn document_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            4 => "[A-Za-z]{1,12}",
            2 => Just(" ".to_string()),
            1 => prop::sample::select(vec![". ", "! ", "? ", ".", ",", "\t", "  "]).prop_map(str::to_string),
            1 => prop::sample::select(vec!["\n", "\n\n", "\n \n", "\n\n\n"]).prop_map(str::to_string),
            1 => prop::sample::select(vec!["é", "日本語。", "<b>", "</b>"]).prop_map(str::to_string),
        ],
        0..80,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn test_identityTranslation_shouldReproduceInput(text in document_text(), budget in 1usize..40) {
        let document = Segmenter::default().segment(&text);
        let plan = Slicer::new(budget, DEFAULT_PARAGRAPH_MARKER).slice(&document);
        let result = Reassembler::new(&document, &plan).reassemble(&untranslated(&plan));

        prop_assert_eq!(result.text, text);
        prop_assert!(result.mismatches.is_empty());
    }

    #[test]
    fn test_slices_shouldRespectBudgetUnlessOversized(text in document_text(), budget in 1usize..40) {
        let document = Segmenter::default().segment(&text);
        let plan = Slicer::new(budget, DEFAULT_PARAGRAPH_MARKER).slice(&document);

        for slice in &plan.slices {
            if slice.oversized {
                prop_assert_eq!(slice.sentence_count(), 1);
                prop_assert!(slice.tokens > budget);
            } else {
                prop_assert!(slice.tokens <= budget);
            }
        }
    }

    #[test]
    fn test_slices_shouldCoverEverySentenceOnceInOrder(text in document_text(), budget in 1usize..40) {
        let document = Segmenter::default().segment(&text);
        let plan = Slicer::new(budget, DEFAULT_PARAGRAPH_MARKER).slice(&document);

        let covered: Vec<(usize, usize)> = plan
            .slices
            .iter()
            .flat_map(|slice| slice.pieces.iter())
            .flat_map(|piece| piece.sentences.clone().map(move |s| (piece.paragraph, s)))
            .collect();
        let expected: Vec<(usize, usize)> = document
            .paragraphs
            .iter()
            .enumerate()
            .flat_map(|(p, paragraph)| (0..paragraph.sentences.len()).map(move |s| (p, s)))
            .collect();
        prop_assert_eq!(covered, expected);

        for (position, slice) in plan.slices.iter().enumerate() {
            prop_assert_eq!(slice.index, position);
        }
    }

    #[test]
    fn test_segmentation_shouldBeIdempotent(text in document_text()) {
        let segmenter = Segmenter::default();
        let first = segmenter.segment(&text);

        prop_assert_eq!(segmenter.segment(&first.render()), first);
    }
}
