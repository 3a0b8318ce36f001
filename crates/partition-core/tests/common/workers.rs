//! Stub workers shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use partition_core::{
    ChunkFailure, ChunkOutcome, Document, Element, PageChunk, PartitionOptions, Partitioner,
    TextLayerPartitioner, WorkerClient,
};

/// Partitions chunk bytes with the bundled engine, like a real worker would
#[derive(Default)]
pub struct EngineWorker {
    pub calls: AtomicUsize,
    /// Chunk indices in the order their first attempt started
    pub started: Mutex<Vec<usize>>,
    /// Artificial latency per chunk index
    pub latency: HashMap<usize, Duration>,
}

impl EngineWorker {
    pub fn with_latency(latency: HashMap<usize, Duration>) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }
}

#[async_trait]
impl WorkerClient for EngineWorker {
    async fn dispatch(
        &self,
        chunk: &PageChunk,
        _endpoint: &str,
        options: &PartitionOptions,
    ) -> ChunkOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().unwrap().push(chunk.index);
        if let Some(delay) = self.latency.get(&chunk.index) {
            tokio::time::sleep(*delay).await;
        }

        let document = Document::new(
            chunk.filename.clone(),
            chunk.content_type.clone(),
            chunk.bytes.as_ref().clone(),
        );
        match TextLayerPartitioner::new().partition(&document, options) {
            Ok(elements) => ChunkOutcome::Success(elements),
            Err(e) => ChunkOutcome::Failure(ChunkFailure::new(400, e.to_string())),
        }
    }
}

/// Replies from a per-chunk script of statuses; the last entry repeats
pub struct ScriptedWorker {
    scripts: HashMap<usize, Vec<u16>>,
    fallback: Vec<u16>,
    attempts: Mutex<HashMap<usize, usize>>,
    pub calls: AtomicUsize,
}

impl ScriptedWorker {
    /// Every chunk follows `script`
    pub fn uniform(script: Vec<u16>) -> Arc<Self> {
        Self::new(HashMap::new(), script)
    }

    /// Chunks listed in `scripts` follow their entry, all others follow `fallback`
    pub fn new(scripts: HashMap<usize, Vec<u16>>, fallback: Vec<u16>) -> Arc<Self> {
        Arc::new(Self {
            scripts,
            fallback,
            attempts: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn attempts_for(&self, index: usize) -> usize {
        self.attempts.lock().unwrap().get(&index).copied().unwrap_or(0)
    }

    fn status_for(&self, index: usize, attempt: usize) -> u16 {
        let script = self.scripts.get(&index).unwrap_or(&self.fallback);
        script[attempt.min(script.len() - 1)]
    }
}

#[async_trait]
impl WorkerClient for ScriptedWorker {
    async fn dispatch(
        &self,
        chunk: &PageChunk,
        _endpoint: &str,
        _options: &PartitionOptions,
    ) -> ChunkOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let entry = attempts.entry(chunk.index).or_insert(0);
            *entry += 1;
            *entry - 1
        };

        match self.status_for(chunk.index, attempt) {
            200 => ChunkOutcome::Success(vec![Element::new(
                "NarrativeText",
                format!("Chunk {} text.", chunk.index),
            )
            .with_page_number(1)]),
            status => ChunkOutcome::Failure(ChunkFailure::new(
                status,
                format!("{{\"detail\":\"worker said {}\"}}", status),
            )),
        }
    }
}
