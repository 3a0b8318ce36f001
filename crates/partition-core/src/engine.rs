//! Local partitioning
//!
//! [`Partitioner`] is the seam where a full layout/OCR engine plugs in. The
//! bundled [`TextLayerPartitioner`] only reads embedded text, which is enough
//! for a process to act as its own worker and for the parallel path to be
//! checked against a single run.

use crate::element::{Element, PartitionOptions};
use crate::error::PartitionError;
use crate::job::Document;
use crate::pdf;

/// Content types the text-layer engine understands besides PDF
const TEXT_CONTENT_TYPES: &[&str] = &["text/plain", "text/markdown", "text/csv", "text/x-rst"];

/// Lines at most this long, without closing punctuation, are treated as titles
const TITLE_MAX_CHARS: usize = 80;

pub trait Partitioner: Send + Sync {
    /// Split a whole document into elements; page numbers are 1-based within `document`
    fn partition(
        &self,
        document: &Document,
        options: &PartitionOptions,
    ) -> Result<Vec<Element>, PartitionError>;
}

#[derive(Debug, Default, Clone)]
pub struct TextLayerPartitioner;

impl TextLayerPartitioner {
    pub fn new() -> Self {
        Self
    }

    fn partition_pdf(
        &self,
        document: &Document,
        options: &PartitionOptions,
    ) -> Result<Vec<Element>, PartitionError> {
        let doc = pdf::load(&document.bytes, &document.filename)?;
        let page_count = doc.get_pages().len() as u32;
        let mut elements = Vec::new();

        for page in 1..=page_count {
            let text = pdf::page_text(&doc, page);
            elements.extend(
                paragraphs(&text)
                    .into_iter()
                    .map(|p| classify(p).with_page_number(page)),
            );
            if options.include_page_breaks {
                elements.push(Element::page_break().with_page_number(page));
            }
        }

        Ok(elements)
    }

    fn partition_text(
        &self,
        document: &Document,
        options: &PartitionOptions,
    ) -> Result<Vec<Element>, PartitionError> {
        let text = decode(&document.bytes, options.encoding.as_deref())?;
        Ok(paragraphs(&text).into_iter().map(classify).collect())
    }
}

impl Partitioner for TextLayerPartitioner {
    fn partition(
        &self,
        document: &Document,
        options: &PartitionOptions,
    ) -> Result<Vec<Element>, PartitionError> {
        let mut elements = if document.is_pdf() {
            self.partition_pdf(document, options)?
        } else if TEXT_CONTENT_TYPES.contains(&document.content_type.as_str()) {
            self.partition_text(document, options)?
        } else {
            return Err(PartitionError::UnsupportedFileType {
                filename: document.filename.clone(),
                content_type: document.content_type.clone(),
            });
        };

        for element in &mut elements {
            element.metadata.filename = Some(document.filename.clone());
        }
        Ok(elements)
    }
}

/// Blank-line separated blocks, with internal whitespace collapsed
fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                out.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current.join(" "));
    }

    out.into_iter()
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect()
}

fn classify(paragraph: String) -> Element {
    let is_title = paragraph.chars().count() <= TITLE_MAX_CHARS
        && !paragraph.ends_with(['.', '!', '?', ':', ';', ','])
        && paragraph.chars().any(char::is_alphabetic);
    let element_type = if is_title { "Title" } else { "NarrativeText" };
    Element::new(element_type, paragraph)
}

fn decode(bytes: &[u8], encoding: Option<&str>) -> Result<String, PartitionError> {
    let encoding = encoding.unwrap_or("utf-8").to_ascii_lowercase().replace('_', "-");
    match encoding.as_str() {
        "utf-8" | "utf8" => String::from_utf8(bytes.to_vec())
            .map_err(|_| PartitionError::InvalidRequest("File is not valid utf-8".into())),
        "ascii" | "us-ascii" => {
            if bytes.is_ascii() {
                Ok(String::from_utf8_lossy(bytes).into_owned())
            } else {
                Err(PartitionError::InvalidRequest(
                    "File is not valid ascii".into(),
                ))
            }
        }
        // Every byte maps to the code point of the same value
        "latin-1" | "latin1" | "iso-8859-1" => Ok(bytes.iter().map(|&b| b as char).collect()),
        other => Err(PartitionError::InvalidRequest(format!(
            "Param encoding {} is not a valid encoding",
            other
        ))),
    }
}
