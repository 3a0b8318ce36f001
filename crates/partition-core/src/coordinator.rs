//! Dispatch coordination
//!
//! Runs every chunk of a job against the worker pool and collapses the
//! per-chunk outcomes into one job outcome.
//!
//! ```text
//!            ┌──────────── Semaphore (pool_size permits) ────────────┐
//! chunks ──▶ │ task 0: dispatch ─▶ fail 5xx ─▶ sleep ─▶ dispatch ─▶ ok │ ──▶ Aggregator
//!            │ task 1: dispatch ─▶ ok                                  │
//!            │ task 2: (waiting for permit)                            │
//!            └──────────────────────────────────────────────────────────┘
//!                         │ terminal failure
//!                         ▼
//!                first-failure slot (set once) ──▶ job error
//! ```
//!
//! Once the slot is set, queued chunks never start and chunks sleeping
//! between retries give up. Requests already on the wire are left to finish
//! in detached tasks; their results are dropped.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn, Instrument};

use crate::aggregate::{Aggregator, ChunkElements};
use crate::element::PartitionOptions;
use crate::job::{AggregatedResult, ChunkFailure, ChunkOutcome, PageChunk, PartitionJob};
use crate::retry::RetryPolicy;
use crate::worker::WorkerClient;

/// Holds the first terminal failure of a job; later writers are ignored
type FailureSlot = Arc<OnceLock<ChunkFailure>>;

enum Resolution {
    Done(ChunkElements),
    Failed(ChunkFailure),
    /// Another chunk already failed the job, so this one stopped early
    Abandoned,
}

pub struct DispatchCoordinator {
    client: Arc<dyn WorkerClient>,
    endpoint: String,
}

impl DispatchCoordinator {
    pub fn new(client: Arc<dyn WorkerClient>, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Dispatch all chunks and merge the results, or report the first terminal failure
    #[instrument(
        skip_all,
        fields(job_id = %job.id, filename = %job.filename, chunk_count = chunks.len())
    )]
    pub async fn run(&self, job: &PartitionJob, chunks: Vec<PageChunk>) -> AggregatedResult {
        let policy = RetryPolicy::new(job.config.max_attempts, job.config.backoff_base);
        let aggregator = Aggregator::new(job.filename.clone(), job.options.include_page_breaks);

        info!(
            total_pages = job.total_pages,
            pool_size = job.config.pool_size,
            "Dispatching chunks"
        );

        let results = if chunks.len() <= 1 || !job.config.enabled {
            self.run_inline(job, chunks, policy).await?
        } else {
            self.run_pooled(job, chunks, policy).await?
        };

        info!("All chunks partitioned");
        Ok(aggregator.merge(results))
    }

    /// Sequential path with no task indirection
    async fn run_inline(
        &self,
        job: &PartitionJob,
        chunks: Vec<PageChunk>,
        policy: RetryPolicy,
    ) -> Result<Vec<ChunkElements>, ChunkFailure> {
        let mut results = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let result = resolve_inline(
                self.client.as_ref(),
                chunk,
                &self.endpoint,
                &job.options,
                policy,
            )
            .await?;
            results.push(result);
        }
        Ok(results)
    }

    async fn run_pooled(
        &self,
        job: &PartitionJob,
        chunks: Vec<PageChunk>,
        policy: RetryPolicy,
    ) -> Result<Vec<ChunkElements>, ChunkFailure> {
        let semaphore = Arc::new(Semaphore::new(job.config.pool_size));
        let slot: FailureSlot = Arc::new(OnceLock::new());
        let mut tasks = JoinSet::new();
        let chunk_count = chunks.len();

        for chunk in chunks {
            let client = self.client.clone();
            let endpoint = self.endpoint.clone();
            let options = job.options.clone();
            let semaphore = semaphore.clone();
            let slot = slot.clone();
            let span = tracing::debug_span!(
                "chunk",
                index = chunk.index,
                pages = %format!("{}..{}", chunk.page_start, chunk.page_end)
            );

            tasks.spawn(
                async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return Resolution::Abandoned;
                    };
                    let resolution =
                        resolve_pooled(client.as_ref(), chunk, &endpoint, &options, policy, &slot)
                            .await;
                    if let Resolution::Failed(failure) = &resolution {
                        // Only the first terminal failure is kept
                        let _ = slot.set(failure.clone());
                    }
                    resolution
                }
                .instrument(span),
            );
        }

        let mut results = Vec::with_capacity(chunk_count);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Resolution::Done(result)) => results.push(result),
                Ok(Resolution::Failed(_)) | Ok(Resolution::Abandoned) => {}
                Err(e) => {
                    error!(error = %e, "Chunk task panicked");
                    let _ = slot.set(ChunkFailure::new(500, format!("Chunk task failed: {}", e)));
                }
            }

            if let Some(failure) = slot.get() {
                let in_flight = tasks.len();
                // Leave in-flight requests to finish on their own
                tasks.detach_all();
                error!(
                    status = failure.status,
                    completed = results.len(),
                    in_flight,
                    "Job failed, discarding partial results"
                );
                return Err(failure.clone());
            }
        }

        Ok(results)
    }
}

enum Attempt {
    Done(ChunkElements),
    RetryAfter(Duration),
    Failed(ChunkFailure),
}

/// Retry loop for the sequential path; nothing else can fail the job meanwhile
async fn resolve_inline(
    client: &dyn WorkerClient,
    mut chunk: PageChunk,
    endpoint: &str,
    options: &PartitionOptions,
    policy: RetryPolicy,
) -> Result<ChunkElements, ChunkFailure> {
    loop {
        match attempt(client, &mut chunk, endpoint, options, policy).await {
            Attempt::Done(result) => return Ok(result),
            Attempt::RetryAfter(delay) => tokio::time::sleep(delay).await,
            Attempt::Failed(failure) => return Err(failure),
        }
    }
}

/// Retry loop for pool tasks; gives up as soon as another chunk has failed the job
async fn resolve_pooled(
    client: &dyn WorkerClient,
    mut chunk: PageChunk,
    endpoint: &str,
    options: &PartitionOptions,
    policy: RetryPolicy,
    slot: &FailureSlot,
) -> Resolution {
    loop {
        if slot.get().is_some() {
            debug!(index = chunk.index, "Skipping chunk, job already failed");
            return Resolution::Abandoned;
        }
        match attempt(client, &mut chunk, endpoint, options, policy).await {
            Attempt::Done(result) => return Resolution::Done(result),
            Attempt::RetryAfter(delay) => tokio::time::sleep(delay).await,
            Attempt::Failed(failure) => return Resolution::Failed(failure),
        }
    }
}

/// One dispatch of `chunk`, with the retry decision for a failure
async fn attempt(
    client: &dyn WorkerClient,
    chunk: &mut PageChunk,
    endpoint: &str,
    options: &PartitionOptions,
    policy: RetryPolicy,
) -> Attempt {
    chunk.attempt_count += 1;
    let attempt = chunk.attempt_count;

    match client.dispatch(chunk, endpoint, options).await {
        ChunkOutcome::Success(elements) => {
            debug!(
                index = chunk.index,
                attempt,
                elements = elements.len(),
                "Chunk partitioned"
            );
            Attempt::Done(ChunkElements {
                index: chunk.index,
                page_start: chunk.page_start,
                page_end: chunk.page_end,
                elements,
            })
        }
        ChunkOutcome::Failure(failure) => match policy.next_delay(&failure, attempt) {
            Some(delay) => {
                warn!(
                    index = chunk.index,
                    attempt,
                    max_attempts = policy.max_attempts,
                    status = failure.status,
                    delay_ms = delay.as_millis() as u64,
                    "Worker error, retrying"
                );
                Attempt::RetryAfter(delay)
            }
            None => {
                warn!(
                    index = chunk.index,
                    attempt,
                    status = failure.status,
                    "Chunk failed terminally"
                );
                Attempt::Failed(failure)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParallelConfig;
    use crate::element::Element;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers from a fixed script, one entry per call; repeats the last entry
    struct Scripted {
        script: Vec<u16>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WorkerClient for Scripted {
        async fn dispatch(
            &self,
            chunk: &PageChunk,
            _endpoint: &str,
            _options: &PartitionOptions,
        ) -> ChunkOutcome {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let status = self.script[n.min(self.script.len() - 1)];
            if status == 200 {
                ChunkOutcome::Success(vec![
                    Element::new("NarrativeText", format!("chunk {}", chunk.index)).with_page_number(1)
                ])
            } else {
                ChunkOutcome::Failure(ChunkFailure::new(status, "{}"))
            }
        }
    }

    fn job(attempts: u32) -> PartitionJob {
        let config = ParallelConfig {
            enabled: true,
            worker_url: Some("http://worker".into()),
            max_attempts: attempts,
            backoff_base: Duration::from_millis(100),
            ..Default::default()
        };
        PartitionJob::new("doc.pdf", 1, Arc::new(config), PartitionOptions::default())
    }

    fn one_chunk() -> Vec<PageChunk> {
        vec![PageChunk {
            index: 0,
            page_start: 0,
            page_end: 1,
            bytes: Arc::new(Vec::new()),
            filename: "doc.pdf".into(),
            content_type: "application/pdf".into(),
            attempt_count: 0,
        }]
    }

    #[tokio::test(start_paused = true)]
    async fn test_inline_retry_then_success() {
        let client = Arc::new(Scripted {
            script: vec![500, 200],
            calls: AtomicUsize::new(0),
        });
        let coordinator = DispatchCoordinator::new(client.clone(), "http://worker");

        let started = tokio::time::Instant::now();
        let result = coordinator.run(&job(2), one_chunk()).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inline_client_error_is_immediate() {
        let client = Arc::new(Scripted {
            script: vec![401],
            calls: AtomicUsize::new(0),
        });
        let coordinator = DispatchCoordinator::new(client.clone(), "http://worker");

        let started = tokio::time::Instant::now();
        let failure = coordinator.run(&job(2), one_chunk()).await.unwrap_err();

        assert_eq!(failure.status, 401);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    fn pages(count: usize) -> Vec<PageChunk> {
        (0..count)
            .map(|i| PageChunk {
                index: i,
                page_start: i as u32,
                page_end: i as u32 + 1,
                ..one_chunk().remove(0)
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_inline_path_stops_at_first_failure() {
        let client = Arc::new(Scripted {
            script: vec![200, 400, 200],
            calls: AtomicUsize::new(0),
        });
        let coordinator = DispatchCoordinator::new(client.clone(), "http://worker");
        let mut job = job(2);
        // Parallel mode off: every chunk runs on the calling task, in order
        job.config = Arc::new(ParallelConfig {
            enabled: false,
            ..(*job.config).clone()
        });

        let failure = coordinator.run(&job, pages(3)).await.unwrap_err();

        assert_eq!(failure.status, 400);
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inline_path_retries_each_chunk() {
        let client = Arc::new(Scripted {
            script: vec![200, 503, 200],
            calls: AtomicUsize::new(0),
        });
        let coordinator = DispatchCoordinator::new(client.clone(), "http://worker");
        let mut job = job(2);
        job.config = Arc::new(ParallelConfig {
            enabled: false,
            ..(*job.config).clone()
        });

        let elements = coordinator.run(&job, pages(2)).await.unwrap();

        assert_eq!(elements.len(), 2);
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }
}
