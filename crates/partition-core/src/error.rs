use thiserror::Error;

use crate::job::ChunkFailure;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PartitionError {
    /// Page count or structure could not be determined. Raised before any dispatch.
    #[error("{0}")]
    InvalidDocument(String),

    #[error("Unable to process {filename}: File type {content_type} is not supported.")]
    UnsupportedFileType {
        filename: String,
        content_type: String,
    },

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Server is under heavy load. Please try again later.")]
    AdmissionRejected,

    /// First terminal chunk failure, surfaced with the worker's status and body.
    #[error("Worker returned status {}: {}", .0.status, .0.body)]
    Worker(ChunkFailure),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Partitioning failed: {0}")]
    Engine(String),
}

impl From<ChunkFailure> for PartitionError {
    fn from(failure: ChunkFailure) -> Self {
        PartitionError::Worker(failure)
    }
}
