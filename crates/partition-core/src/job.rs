//! Job, chunk and outcome types shared by the orchestrator stages

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::config::ParallelConfig;
use crate::element::{Element, PartitionOptions};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// An uploaded file as received from the caller
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub content_type: String,
    pub bytes: Arc<Vec<u8>>,
}

impl Document {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: Arc::new(bytes),
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type == PDF_CONTENT_TYPE
    }
}

/// One inbound file being partitioned in parallel mode. Immutable once built.
#[derive(Debug, Clone)]
pub struct PartitionJob {
    /// Per-run id for log correlation; never written into output
    pub id: Uuid,
    pub filename: String,
    pub total_pages: u32,
    pub config: Arc<ParallelConfig>,
    pub options: PartitionOptions,
}

impl PartitionJob {
    pub fn new(
        filename: impl Into<String>,
        total_pages: u32,
        config: Arc<ParallelConfig>,
        options: PartitionOptions,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            total_pages,
            config,
            options,
        }
    }
}

/// A contiguous page range of the source document, dispatched as one unit
#[derive(Debug, Clone)]
pub struct PageChunk {
    /// Position in the final output; 0-based
    pub index: usize,
    /// First page, 0-based inclusive
    pub page_start: u32,
    /// One past the last page
    pub page_end: u32,
    /// Standalone document holding only this range
    pub bytes: Arc<Vec<u8>>,
    /// Filename sent with the chunk
    pub filename: String,
    pub content_type: String,
    /// Attempts made so far; only the coordinator touches this
    pub attempt_count: u32,
}

impl PageChunk {
    pub fn page_count(&self) -> u32 {
        self.page_end - self.page_start
    }
}

/// Result of one dispatch of one chunk
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    Success(Vec<Element>),
    Failure(ChunkFailure),
}

/// A non-success response from a worker, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkFailure {
    pub status: u16,
    pub body: String,
}

/// How a failed status is treated by the retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 5xx: retryable up to the attempt ceiling
    TransientWorkerError,
    /// 4xx: terminal on first sight
    ClientRequestError,
    /// Anything else that is not a success
    Other,
}

impl ChunkFailure {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self.status {
            500..=599 => FailureKind::TransientWorkerError,
            400..=499 => FailureKind::ClientRequestError,
            _ => FailureKind::Other,
        }
    }
}

/// Whole-document result: every element in order, or the first terminal failure
pub type AggregatedResult = Result<Vec<Element>, ChunkFailure>;
