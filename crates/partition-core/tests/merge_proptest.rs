//! Property tests for chunk boundaries and result merging

use partition_core::{split, Aggregator, ChunkElements, ChunkSizing, Element};
use proptest::prelude::*;

fn sizing_strategy() -> impl Strategy<Value = ChunkSizing> {
    prop_oneof![
        (1u32..20).prop_map(ChunkSizing::PagesPerChunk),
        (1u32..20).prop_map(ChunkSizing::ChunkCount),
    ]
}

/// Chunk results for `pages` pages cut `per_chunk` at a time, each page
/// holding one paragraph and, when asked, a closing page break
fn chunk_results(pages: u32, per_chunk: u32, with_breaks: bool) -> Vec<ChunkElements> {
    split(pages, ChunkSizing::PagesPerChunk(per_chunk))
        .into_iter()
        .map(|range| {
            let mut elements = Vec::new();
            for local in 1..=(range.end - range.start) {
                let page = range.start + local;
                elements.push(
                    Element::new("NarrativeText", format!("Paragraph on page {}.", page))
                        .with_page_number(local),
                );
                if with_breaks {
                    elements.push(Element::page_break().with_page_number(local));
                }
            }
            ChunkElements {
                index: range.index,
                page_start: range.start,
                page_end: range.end,
                elements,
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn proptest_ranges_cover_every_page_once(total in 0u32..500, sizing in sizing_strategy()) {
        let ranges = split(total, sizing);

        prop_assert!(!ranges.is_empty());
        prop_assert_eq!(ranges[0].start, 0);
        prop_assert_eq!(ranges.last().unwrap().end, total);
        for (i, pair) in ranges.windows(2).enumerate() {
            prop_assert_eq!(pair[0].end, pair[1].start);
            prop_assert_eq!(pair[0].index, i);
        }
        if total > 0 {
            prop_assert!(ranges.iter().all(|r| r.start < r.end));
        }
    }

    #[test]
    fn proptest_chunk_count_is_balanced(total in 1u32..500, count in 1u32..50) {
        let ranges = split(total, ChunkSizing::ChunkCount(count));
        let sizes: Vec<u32> = ranges.iter().map(|r| r.end - r.start).collect();

        prop_assert_eq!(ranges.len() as u32, count.min(total));
        let max = *sizes.iter().max().unwrap();
        let min = *sizes.iter().min().unwrap();
        prop_assert!(max - min <= 1);
    }

    #[test]
    fn proptest_merge_ignores_arrival_order(
        pages in 1u32..40,
        per_chunk in 1u32..6,
        with_breaks in any::<bool>(),
        keys in prop::collection::vec(any::<u64>(), 40),
    ) {
        let ordered = chunk_results(pages, per_chunk, with_breaks);
        let mut shuffled = ordered.clone();
        shuffled.sort_by_key(|r| keys[r.index]);

        let aggregator = Aggregator::new("doc.pdf", with_breaks);
        prop_assert_eq!(aggregator.merge(ordered), aggregator.merge(shuffled));
    }

    #[test]
    fn proptest_merged_pages_are_monotonic(pages in 1u32..40, per_chunk in 1u32..6) {
        let merged = Aggregator::new("doc.pdf", true).merge(chunk_results(pages, per_chunk, true));

        let numbers: Vec<u32> = merged.iter().filter_map(|e| e.metadata.page_number).collect();
        prop_assert!(numbers.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(numbers.last().copied(), Some(pages));

        // Exactly one break per page, in page order
        let breaks: Vec<Option<u32>> = merged
            .iter()
            .filter(|e| e.is_page_break())
            .map(|e| e.metadata.page_number)
            .collect();
        let expected: Vec<Option<u32>> = (1..=pages).map(Some).collect();
        prop_assert_eq!(breaks, expected);
    }

    #[test]
    fn proptest_blank_pages_merge_like_a_single_run(
        pages in 1u32..40,
        per_chunk in 1u32..6,
        blank in prop::collection::vec(any::<bool>(), 40),
    ) {
        // A blank page yields only its closing break
        let page_elements = |page: u32, local: u32| {
            let mut elements = Vec::new();
            if !blank[(page - 1) as usize] {
                elements.push(
                    Element::new("NarrativeText", format!("Paragraph on page {}.", page))
                        .with_page_number(local),
                );
            }
            elements.push(Element::page_break().with_page_number(local));
            elements
        };

        let single_run: Vec<Element> = (1..=pages)
            .flat_map(|page| page_elements(page, page))
            .map(|e| e.with_filename("doc.pdf"))
            .collect();
        let results: Vec<ChunkElements> = split(pages, ChunkSizing::PagesPerChunk(per_chunk))
            .into_iter()
            .map(|range| ChunkElements {
                index: range.index,
                page_start: range.start,
                page_end: range.end,
                elements: (1..=(range.end - range.start))
                    .flat_map(|local| page_elements(range.start + local, local))
                    .collect(),
            })
            .collect();

        prop_assert_eq!(Aggregator::new("doc.pdf", true).merge(results), single_run);
    }

    #[test]
    fn proptest_breaks_inserted_at_seams(pages in 2u32..40, per_chunk in 1u32..6) {
        // Workers that never emit breaks still get one between chunks
        let results = chunk_results(pages, per_chunk, false);
        let seams = results.len() - 1;
        let merged = Aggregator::new("doc.pdf", true).merge(results);

        let breaks = merged.iter().filter(|e| e.is_page_break()).count();
        prop_assert_eq!(breaks, seams);
        prop_assert!(!merged.last().unwrap().is_page_break());
    }
}
