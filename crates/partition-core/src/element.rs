//! Partitioned elements and the per-file options that produce them
//!
//! The element model is intentionally thin: the orchestrator only needs the
//! type tag, page number and filename. Everything else a worker returns in
//! `metadata` is carried through untouched.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Element type emitted between pages when page breaks are requested
pub const PAGE_BREAK: &str = "PageBreak";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub element_type: String,
    pub element_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub metadata: ElementMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// Worker-specific metadata we do not interpret
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Element {
    pub fn new(element_type: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            element_type: element_type.into(),
            element_id: element_id(&text),
            text,
            metadata: ElementMetadata::default(),
        }
    }

    pub fn page_break() -> Self {
        Self::new(PAGE_BREAK, "")
    }

    pub fn with_page_number(mut self, page_number: u32) -> Self {
        self.metadata.page_number = Some(page_number);
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.metadata.filename = Some(filename.into());
        self
    }

    pub fn is_page_break(&self) -> bool {
        self.element_type == PAGE_BREAK
    }
}

/// Content-derived id, so the same text gets the same id however the document was split
pub fn element_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(digest)[..32].to_string()
}

/// Partitioning strategy requested by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Auto,
    Fast,
    HiRes,
    OcrOnly,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Auto => "auto",
            Strategy::Fast => "fast",
            Strategy::HiRes => "hi_res",
            Strategy::OcrOnly => "ocr_only",
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = crate::PartitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Strategy::Auto),
            "fast" => Ok(Strategy::Fast),
            "hi_res" => Ok(Strategy::HiRes),
            "ocr_only" => Ok(Strategy::OcrOnly),
            other => Err(crate::PartitionError::InvalidRequest(format!(
                "Invalid strategy: {}. Must be one of [\"auto\", \"fast\", \"hi_res\", \"ocr_only\"]",
                other
            ))),
        }
    }
}

/// Processing options shared by every chunk of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionOptions {
    pub strategy: Strategy,
    pub include_page_breaks: bool,
    pub coordinates: bool,
    pub encoding: Option<String>,
    pub ocr_languages: Vec<String>,
    pub skip_infer_table_types: Vec<String>,
    pub xml_keep_tags: bool,
}

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Auto,
            include_page_breaks: false,
            coordinates: false,
            encoding: None,
            ocr_languages: vec!["eng".to_string()],
            skip_infer_table_types: Vec::new(),
            xml_keep_tags: false,
        }
    }
}

impl PartitionOptions {
    /// Render the options as form fields, in the same shape the API accepts them
    pub fn to_form_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("strategy".to_string(), self.strategy.as_str().to_string()),
            (
                "include_page_breaks".to_string(),
                self.include_page_breaks.to_string(),
            ),
            ("coordinates".to_string(), self.coordinates.to_string()),
            ("xml_keep_tags".to_string(), self.xml_keep_tags.to_string()),
        ];
        if let Some(encoding) = &self.encoding {
            fields.push(("encoding".to_string(), encoding.clone()));
        }
        for lang in &self.ocr_languages {
            fields.push(("ocr_languages".to_string(), lang.clone()));
        }
        for table_type in &self.skip_infer_table_types {
            fields.push(("skip_infer_table_types".to_string(), table_type.clone()));
        }
        fields
    }
}
