//! Page-range chunking
//!
//! Splits a page count into contiguous ranges, then cuts the document into
//! one standalone file per range. Boundaries depend only on the page count
//! and sizing, so re-running a job produces the same chunks.

use std::sync::Arc;

use crate::error::PartitionError;
use crate::job::{Document, PageChunk};
use crate::pdf;

/// How to size chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSizing {
    /// Fixed number of pages per chunk; the last chunk may be shorter
    PagesPerChunk(u32),
    /// Aim for this many chunks, spreading any remainder over the first ones
    ChunkCount(u32),
}

/// A 0-based half-open page range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub index: usize,
    pub start: u32,
    pub end: u32,
}

/// Chunks for one document together with the page count they cover
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    pub total_pages: u32,
    pub chunks: Vec<PageChunk>,
}

/// Split `total_pages` into contiguous ranges covering `[0, total_pages)`
///
/// Always returns at least one range. A document with no countable pages
/// comes back as the single range `[0, 0)`, meaning "the whole thing".
pub fn split(total_pages: u32, sizing: ChunkSizing) -> Vec<PageRange> {
    if total_pages == 0 {
        return vec![PageRange {
            index: 0,
            start: 0,
            end: 0,
        }];
    }

    let mut ranges = Vec::new();
    match sizing {
        ChunkSizing::PagesPerChunk(size) => {
            let size = size.max(1);
            let mut start = 0;
            while start < total_pages {
                let end = start.saturating_add(size).min(total_pages);
                ranges.push(PageRange {
                    index: ranges.len(),
                    start,
                    end,
                });
                start = end;
            }
        }
        ChunkSizing::ChunkCount(count) => {
            let count = count.clamp(1, total_pages);
            let base = total_pages / count;
            let remainder = total_pages % count;
            let mut start = 0;
            for i in 0..count {
                let len = base + u32::from(i < remainder);
                ranges.push(PageRange {
                    index: i as usize,
                    start,
                    end: start + len,
                });
                start += len;
            }
        }
    }
    ranges
}

/// Determine the page count and cut the document into chunks
///
/// Fails with [`PartitionError::InvalidDocument`] when a PDF's page count
/// cannot be read, before anything is dispatched. Non-PDF documents are
/// not paginated and always become a single chunk.
pub fn chunk_document(document: &Document, sizing: ChunkSizing) -> Result<ChunkPlan, PartitionError> {
    if !document.is_pdf() {
        return Ok(ChunkPlan {
            total_pages: 1,
            chunks: vec![whole_document_chunk(document, 1)],
        });
    }

    let doc = pdf::load(&document.bytes, &document.filename)?;
    let total_pages = doc.get_pages().len() as u32;
    let ranges = split(total_pages, sizing);

    // A single range is the original file; skip the re-serialisation
    if ranges.len() == 1 {
        return Ok(ChunkPlan {
            total_pages,
            chunks: vec![whole_document_chunk(document, total_pages)],
        });
    }

    let chunks = ranges
        .into_iter()
        .map(|range| {
            let bytes = pdf::extract_range(&doc, range.start, range.end)?;
            Ok(PageChunk {
                index: range.index,
                page_start: range.start,
                page_end: range.end,
                bytes: Arc::new(bytes),
                filename: document.filename.clone(),
                content_type: document.content_type.clone(),
                attempt_count: 0,
            })
        })
        .collect::<Result<Vec<_>, PartitionError>>()?;

    tracing::debug!(
        filename = %document.filename,
        total_pages,
        chunk_count = chunks.len(),
        "Document split into chunks"
    );

    Ok(ChunkPlan {
        total_pages,
        chunks,
    })
}

fn whole_document_chunk(document: &Document, total_pages: u32) -> PageChunk {
    PageChunk {
        index: 0,
        page_start: 0,
        page_end: total_pages,
        bytes: document.bytes.clone(),
        filename: document.filename.clone(),
        content_type: document.content_type.clone(),
        attempt_count: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::numbered_pdf;
    use crate::job::PDF_CONTENT_TYPE;

    fn bounds(ranges: &[PageRange]) -> Vec<(u32, u32)> {
        ranges.iter().map(|r| (r.start, r.end)).collect()
    }

    #[test]
    fn test_split_pages_per_chunk() {
        let ranges = split(5, ChunkSizing::PagesPerChunk(2));
        assert_eq!(bounds(&ranges), vec![(0, 2), (2, 4), (4, 5)]);
        assert_eq!(
            ranges.iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_split_one_page_per_chunk() {
        let ranges = split(3, ChunkSizing::PagesPerChunk(1));
        assert_eq!(bounds(&ranges), vec![(0, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_split_chunk_count_spreads_remainder() {
        let ranges = split(10, ChunkSizing::ChunkCount(3));
        assert_eq!(bounds(&ranges), vec![(0, 4), (4, 7), (7, 10)]);
    }

    #[test]
    fn test_split_more_chunks_than_pages() {
        let ranges = split(2, ChunkSizing::ChunkCount(8));
        assert_eq!(bounds(&ranges), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_split_single_page_is_one_chunk() {
        assert_eq!(bounds(&split(1, ChunkSizing::PagesPerChunk(4))), vec![(0, 1)]);
    }

    #[test]
    fn test_split_zero_pages_is_one_chunk() {
        assert_eq!(bounds(&split(0, ChunkSizing::PagesPerChunk(1))), vec![(0, 0)]);
    }

    #[test]
    fn test_split_is_deterministic() {
        let a = split(17, ChunkSizing::ChunkCount(4));
        let b = split(17, ChunkSizing::ChunkCount(4));
        assert_eq!(a, b);
    }

    #[test]
    fn test_chunk_document_cuts_pdf() {
        let doc = Document::new("paper.pdf", PDF_CONTENT_TYPE, numbered_pdf(5));
        let plan = chunk_document(&doc, ChunkSizing::PagesPerChunk(2)).unwrap();

        assert_eq!(plan.total_pages, 5);
        assert_eq!(plan.chunks.len(), 3);
        for chunk in &plan.chunks {
            assert_eq!(
                pdf::page_count(&chunk.bytes, "chunk.pdf").unwrap(),
                chunk.page_count()
            );
            assert_eq!(chunk.attempt_count, 0);
            assert_eq!(chunk.filename, "paper.pdf");
        }
    }

    #[test]
    fn test_chunk_document_single_range_passes_bytes_through() {
        let bytes = numbered_pdf(2);
        let doc = Document::new("small.pdf", PDF_CONTENT_TYPE, bytes.clone());
        let plan = chunk_document(&doc, ChunkSizing::PagesPerChunk(10)).unwrap();
        assert_eq!(plan.chunks.len(), 1);
        assert_eq!(*plan.chunks[0].bytes, bytes);
    }

    #[test]
    fn test_chunk_document_rejects_bad_pdf_before_dispatch() {
        let doc = Document::new("bad.pdf", PDF_CONTENT_TYPE, b"nope".to_vec());
        let err = chunk_document(&doc, ChunkSizing::PagesPerChunk(1)).unwrap_err();
        assert!(matches!(err, PartitionError::InvalidDocument(_)));
    }

    #[test]
    fn test_chunk_document_non_pdf_is_single_chunk() {
        let doc = Document::new("notes.txt", "text/plain", b"hello".to_vec());
        let plan = chunk_document(&doc, ChunkSizing::PagesPerChunk(1)).unwrap();
        assert_eq!(plan.chunks.len(), 1);
        assert_eq!(plan.chunks[0].page_start, 0);
        assert_eq!(plan.chunks[0].page_end, 1);
    }
}
