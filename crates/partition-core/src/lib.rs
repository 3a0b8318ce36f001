//! Parallel document partitioning
//!
//! Splits paginated documents into page-range chunks, dispatches each chunk
//! to a worker, retries transient failures and merges the results back into
//! one ordered element stream.
//!
//! ```text
//! admission ─▶ chunker ─▶ coordinator ─┬─▶ worker client (per chunk, with retry)
//!                                      └─▶ aggregator ─▶ elements
//! ```
//!
//! Documents that are not split are handled by a local [`Partitioner`].

pub mod admission;
pub mod aggregate;
pub mod chunker;
pub mod config;
pub mod coordinator;
pub mod element;
pub mod engine;
pub mod error;
#[doc(hidden)]
pub mod fixtures;
pub mod job;
pub mod pdf;
pub mod retry;
pub mod service;
pub mod worker;

pub use admission::{AdmissionGate, AlwaysAdmit, MemoryFloorGate};
pub use aggregate::{Aggregator, ChunkElements};
pub use chunker::{chunk_document, split, ChunkPlan, ChunkSizing, PageRange};
pub use config::ParallelConfig;
pub use coordinator::DispatchCoordinator;
pub use element::{Element, ElementMetadata, PartitionOptions, Strategy, PAGE_BREAK};
pub use engine::{Partitioner, TextLayerPartitioner};
pub use error::PartitionError;
pub use job::{
    AggregatedResult, ChunkFailure, ChunkOutcome, Document, FailureKind, PageChunk, PartitionJob,
    PDF_CONTENT_TYPE,
};
pub use retry::{backoff_delay, should_retry, RetryPolicy};
pub use service::PartitionService;
pub use worker::{HttpWorkerClient, WorkerClient};
