//! Per-file entry point tying admission, chunking, dispatch and the local engine together

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, info};

use crate::admission::AdmissionGate;
use crate::chunker::chunk_document;
use crate::config::ParallelConfig;
use crate::coordinator::DispatchCoordinator;
use crate::element::{Element, PartitionOptions};
use crate::engine::Partitioner;
use crate::error::PartitionError;
use crate::job::{Document, PartitionJob};
use crate::pdf;
use crate::worker::WorkerClient;

#[derive(Clone)]
pub struct PartitionService {
    config: Arc<ParallelConfig>,
    engine: Arc<dyn Partitioner>,
    gate: Arc<dyn AdmissionGate>,
    coordinator: Option<Arc<DispatchCoordinator>>,
}

impl PartitionService {
    /// Fails when parallel mode is enabled without a worker endpoint
    pub fn new(
        config: ParallelConfig,
        engine: Arc<dyn Partitioner>,
        worker: Arc<dyn WorkerClient>,
        gate: Arc<dyn AdmissionGate>,
    ) -> Result<Self, PartitionError> {
        config.validate()?;
        let coordinator = match (config.enabled, &config.worker_url) {
            (true, Some(url)) => Some(Arc::new(DispatchCoordinator::new(worker, url.clone()))),
            _ => None,
        };
        Ok(Self {
            config: Arc::new(config),
            engine,
            gate,
            coordinator,
        })
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Admission check on its own, for callers handling several files per request
    pub fn admit(&self, client: Option<IpAddr>) -> Result<(), PartitionError> {
        self.gate.admit(client)
    }

    /// Admit, then partition one file
    pub async fn partition_file(
        &self,
        document: Document,
        options: PartitionOptions,
        client: Option<IpAddr>,
    ) -> Result<Vec<Element>, PartitionError> {
        self.admit(client)?;
        self.partition_document(document, options).await
    }

    /// Partition one file of an already admitted request
    ///
    /// PDFs go through the worker pool when parallel mode is on; everything
    /// else is partitioned in-process. A PDF whose page count cannot be read
    /// fails the same way on both paths, before any work is dispatched.
    pub async fn partition_document(
        &self,
        document: Document,
        options: PartitionOptions,
    ) -> Result<Vec<Element>, PartitionError> {
        match &self.coordinator {
            Some(coordinator) if document.is_pdf() => {
                self.partition_parallel(coordinator, document, options).await
            }
            _ => self.partition_local(document, options).await,
        }
    }

    async fn partition_parallel(
        &self,
        coordinator: &DispatchCoordinator,
        document: Document,
        options: PartitionOptions,
    ) -> Result<Vec<Element>, PartitionError> {
        let sizing = self.config.sizing;
        let filename = document.filename.clone();
        let plan = tokio::task::spawn_blocking(move || chunk_document(&document, sizing))
            .await
            .map_err(|e| PartitionError::Engine(e.to_string()))??;

        let job = PartitionJob::new(filename, plan.total_pages, self.config.clone(), options);
        info!(
            job_id = %job.id,
            filename = %job.filename,
            total_pages = plan.total_pages,
            chunks = plan.chunks.len(),
            "Partitioning in parallel mode"
        );

        Ok(coordinator.run(&job, plan.chunks).await?)
    }

    async fn partition_local(
        &self,
        document: Document,
        options: PartitionOptions,
    ) -> Result<Vec<Element>, PartitionError> {
        debug!(filename = %document.filename, "Partitioning locally");
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || {
            if document.is_pdf() {
                pdf::page_count(&document.bytes, &document.filename)?;
            }
            engine.partition(&document, &options)
        })
        .await
        .map_err(|e| PartitionError::Engine(e.to_string()))?
    }
}
