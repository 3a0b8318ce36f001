//! Sending one chunk to one worker
//!
//! The coordinator depends only on [`WorkerClient`]; the HTTP client below
//! is the production implementation. No retrying happens at this layer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::element::{Element, PartitionOptions};
use crate::error::PartitionError;
use crate::job::{ChunkFailure, ChunkOutcome, PageChunk};

/// Status reported when the worker could not be reached or answered garbage
pub const BAD_GATEWAY: u16 = 502;
/// Status reported when the transport timed out
pub const GATEWAY_TIMEOUT: u16 = 504;

#[async_trait]
pub trait WorkerClient: Send + Sync {
    /// Send `chunk` with `options` to `endpoint` and report what came back
    async fn dispatch(
        &self,
        chunk: &PageChunk,
        endpoint: &str,
        options: &PartitionOptions,
    ) -> ChunkOutcome;
}

/// POSTs chunks as multipart uploads, mirroring the API's own request shape
#[derive(Clone)]
pub struct HttpWorkerClient {
    client: reqwest::Client,
}

impl HttpWorkerClient {
    pub fn new(request_timeout: Duration) -> Result<Self, PartitionError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| PartitionError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn form(chunk: &PageChunk, options: &PartitionOptions) -> Result<Form, reqwest::Error> {
        let file = Part::bytes(chunk.bytes.as_ref().clone())
            .file_name(chunk.filename.clone())
            .mime_str(&chunk.content_type)?;

        let form = options
            .to_form_fields()
            .into_iter()
            .fold(Form::new().part("files", file), |form, (key, value)| {
                form.text(key, value)
            });
        Ok(form)
    }
}

#[async_trait]
impl WorkerClient for HttpWorkerClient {
    async fn dispatch(
        &self,
        chunk: &PageChunk,
        endpoint: &str,
        options: &PartitionOptions,
    ) -> ChunkOutcome {
        let form = match Self::form(chunk, options) {
            Ok(form) => form,
            Err(e) => {
                return ChunkOutcome::Failure(ChunkFailure::new(
                    400,
                    format!("Invalid content type {}: {}", chunk.content_type, e),
                ))
            }
        };

        let response = match self.client.post(endpoint).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => return ChunkOutcome::Failure(transport_failure(&e)),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return ChunkOutcome::Failure(transport_failure(&e)),
        };

        if !status.is_success() {
            return ChunkOutcome::Failure(ChunkFailure::new(status.as_u16(), body));
        }

        match serde_json::from_str::<Vec<Element>>(&body) {
            Ok(elements) => ChunkOutcome::Success(elements),
            Err(e) => ChunkOutcome::Failure(ChunkFailure::new(
                BAD_GATEWAY,
                format!("Worker returned an unreadable element list: {}", e),
            )),
        }
    }
}

fn transport_failure(e: &reqwest::Error) -> ChunkFailure {
    let status = if e.is_timeout() {
        GATEWAY_TIMEOUT
    } else {
        BAD_GATEWAY
    };
    ChunkFailure::new(status, format!("Worker request failed: {}", e))
}
