//! Property tests for recursive chunking.

use proptest::prelude::*;
use webqa_rag::{Chunker, Document, RecursiveChunker};

/// Chunk sizes paired with a strictly smaller overlap.
fn arb_params() -> impl Strategy<Value = (usize, usize)> {
    (2usize..80).prop_flat_map(|size| (Just(size), 0..size))
}

/// Prose-like text with paragraph, sentence and multi-byte characters.
fn arb_text() -> impl Strategy<Value = String> {
    "[a-zé .!?\n]{0,600}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn chunks_are_bounded_overlapping_and_reconstruct_the_text(
        text in arb_text(),
        (size, overlap) in arb_params(),
    ) {
        let chunker = RecursiveChunker::new(size, overlap).unwrap();
        let chunks = chunker.chunk(&Document::new("https://p.test", text.clone()));

        if text.trim().is_empty() {
            prop_assert!(chunks.is_empty());
            return Ok(());
        }
        prop_assert!(!chunks.is_empty());
        prop_assert_eq!(chunks[0].start, 0);

        let mut rebuilt = String::new();
        let mut prev_end = 0;
        for (i, chunk) in chunks.iter().enumerate() {
            prop_assert!(chunk.text.chars().count() <= size, "chunk over {} chars: {:?}", size, chunk.text);
            prop_assert_eq!(&text[chunk.start..chunk.start + chunk.text.len()], chunk.text.as_str());
            prop_assert_eq!(chunk.index, i);
            prop_assert_eq!(chunk.origin.as_str(), "https://p.test");

            if i > 0 {
                prop_assert!(chunk.start <= prev_end, "gap before chunk {}", i);
                let shared = text[chunk.start..prev_end].chars().count();
                prop_assert!(shared <= overlap, "overlap {} exceeds {}", shared, overlap);
            }
            rebuilt.push_str(&text[prev_end.max(chunk.start)..chunk.start + chunk.text.len()]);
            prev_end = chunk.start + chunk.text.len();
        }

        prop_assert_eq!(prev_end, text.len());
        prop_assert_eq!(rebuilt, text);
    }

    #[test]
    fn chunking_is_deterministic(text in arb_text(), (size, overlap) in arb_params()) {
        let chunker = RecursiveChunker::new(size, overlap).unwrap();
        let doc = Document::new("https://p.test", text);
        prop_assert_eq!(chunker.chunk(&doc), chunker.chunk(&doc));
    }
}
