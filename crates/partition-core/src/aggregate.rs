//! Reassembling chunk results into one document-order element stream
//!
//! Workers see each chunk as a standalone file, so their page numbers start
//! at 1 and their filename is whatever we uploaded. Merging undoes both and
//! smooths out page breaks that only exist because of the split.

use crate::element::Element;

/// Elements returned for one chunk, tagged with where the chunk sits
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkElements {
    pub index: usize,
    pub page_start: u32,
    pub page_end: u32,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    filename: String,
    include_page_breaks: bool,
}

impl Aggregator {
    pub fn new(filename: impl Into<String>, include_page_breaks: bool) -> Self {
        Self {
            filename: filename.into(),
            include_page_breaks,
        }
    }

    /// Merge successful chunk results in chunk-index order
    ///
    /// The input order does not matter: results are sorted by index first, so
    /// the order in which workers finished never shows up in the output.
    ///
    /// Seams are handled as follows:
    /// - a page break that opens a chunk is dropped when it repeats the break
    ///   that closed the previous chunk: same page, or no page of its own.
    ///   A break for one of the chunk's own pages is kept, so blank pages
    ///   keep their marker;
    /// - when page breaks were requested, a missing break between two
    ///   chunks is inserted, because a single run would have emitted one.
    ///
    /// Elements that straddle a seam (a table continuing onto the next page)
    /// are kept as the two pieces the workers returned. A single run splits
    /// them at the page boundary as well.
    pub fn merge(&self, mut results: Vec<ChunkElements>) -> Vec<Element> {
        results.sort_by_key(|r| r.index);

        let total: usize = results.iter().map(|r| r.elements.len()).sum();
        let mut merged: Vec<Element> = Vec::with_capacity(total);
        let last_index = results.len().saturating_sub(1);

        for (position, result) in results.into_iter().enumerate() {
            let page_start = result.page_start;
            let page_end = result.page_end;

            for (i, element) in result.elements.into_iter().enumerate() {
                let element = self.localise(element, page_start);
                if i == 0 && repeats_seam_break(merged.last(), &element) {
                    continue;
                }
                merged.push(element);
            }

            if self.include_page_breaks && position < last_index && !ends_with_page_break(&merged)
            {
                merged.push(
                    Element::page_break()
                        .with_page_number(page_end.max(1))
                        .with_filename(self.filename.clone()),
                );
            }
        }

        merged
    }

    fn localise(&self, mut element: Element, page_start: u32) -> Element {
        if let Some(page) = element.metadata.page_number {
            element.metadata.page_number = Some(page + page_start);
        }
        element.metadata.filename = Some(self.filename.clone());
        element
    }
}

/// Whether `element` is a leading break that only marks the seam already closed by `previous`
fn repeats_seam_break(previous: Option<&Element>, element: &Element) -> bool {
    match previous {
        Some(previous) if previous.is_page_break() && element.is_page_break() => {
            element.metadata.page_number.is_none()
                || element.metadata.page_number == previous.metadata.page_number
        }
        _ => false,
    }
}

fn ends_with_page_break(elements: &[Element]) -> bool {
    elements.last().is_some_and(Element::is_page_break)
}
