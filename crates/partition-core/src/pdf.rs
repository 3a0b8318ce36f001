//! PDF inspection and page-range extraction
//!
//! Page ranges are cut with the same "Construction by Whitelist" approach as
//! a page split: clone the document, drop every page outside the range,
//! prune orphaned objects and re-serialise.

use crate::error::PartitionError;
use lopdf::Document;

/// Parse a PDF, rejecting anything whose page tree cannot be read
///
/// Encrypted files are rejected separately so the caller gets an actionable
/// message instead of a generic parse failure.
pub fn load(bytes: &[u8], filename: &str) -> Result<Document, PartitionError> {
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!(filename, error = %e, "PDF failed to parse");
            if looks_encrypted(bytes) {
                return Err(encrypted(filename));
            }
            return Err(invalid(filename));
        }
    };

    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(encrypted(filename));
    }

    Ok(doc)
}

/// Parse PDF bytes and return page count
pub fn page_count(bytes: &[u8], filename: &str) -> Result<u32, PartitionError> {
    Ok(load(bytes, filename)?.get_pages().len() as u32)
}

/// Serialise pages `[start, end)` (0-based) of `doc` as a standalone PDF
pub fn extract_range(doc: &Document, start: u32, end: u32) -> Result<Vec<u8>, PartitionError> {
    let page_count = doc.get_pages().len() as u32;

    if start >= end {
        return Err(PartitionError::InvalidRequest(format!(
            "Empty page range {}..{}",
            start, end
        )));
    }
    if end > page_count {
        return Err(PartitionError::InvalidRequest(format!(
            "Page {} does not exist (document has {} pages)",
            end, page_count
        )));
    }

    let mut new_doc = doc.clone();

    // lopdf page numbers are 1-based; delete from the back so numbering stays stable
    let mut pages_to_delete: Vec<u32> = (1..=page_count)
        .filter(|p| *p <= start || *p > end)
        .collect();
    pages_to_delete.reverse();
    for page_num in pages_to_delete {
        new_doc.delete_pages(&[page_num]);
    }

    new_doc.prune_objects();
    new_doc.compress();

    let mut buffer = Vec::new();
    new_doc
        .save_to(&mut buffer)
        .map_err(|e| PartitionError::Engine(format!("Save failed: {}", e)))?;

    Ok(buffer)
}

/// Text layer of one page (1-based), or empty when the page has none we can decode
pub fn page_text(doc: &Document, page_number: u32) -> String {
    match doc.extract_text(&[page_number]) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(page_number, error = %e, "Could not extract page text");
            String::new()
        }
    }
}

fn looks_encrypted(bytes: &[u8]) -> bool {
    bytes.windows(8).any(|w| w == b"/Encrypt")
}

fn invalid(filename: &str) -> PartitionError {
    PartitionError::InvalidDocument(format!("{} does not appear to be a valid PDF", filename))
}

fn encrypted(filename: &str) -> PartitionError {
    PartitionError::InvalidDocument(format!(
        "File: {} is encrypted. Please decrypt it with password.",
        filename
    ))
}
