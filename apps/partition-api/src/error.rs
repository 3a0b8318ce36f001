//! Error types for the partition server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use partition_core::{ChunkFailure, PartitionError};
use serde::Serialize;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ServerError::Partition(PartitionError::Worker(failure)) => {
                return worker_failure_response(failure)
            }
            ServerError::Partition(err) => {
                let status = match &err {
                    PartitionError::InvalidDocument(_)
                    | PartitionError::UnsupportedFileType { .. }
                    | PartitionError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    PartitionError::AdmissionRejected => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            ServerError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServerError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", message);
        }

        (status, Json(ErrorResponse { detail: message })).into_response()
    }
}

/// Relay a worker's error as-is: same status, same body
fn worker_failure_response(failure: ChunkFailure) -> Response {
    let status =
        StatusCode::from_u16(failure.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    match serde_json::from_str::<serde_json::Value>(&failure.body) {
        Ok(body) => (status, Json(body)).into_response(),
        Err(_) => (status, Json(ErrorResponse { detail: failure.body })).into_response(),
    }
}
