//! API handlers for the partition server
//!
//! Provides REST endpoints for:
//! - Health checks
//! - Document partitioning (single or multiple files per request)

use std::net::SocketAddr;
use std::path::Path;

use axum::extract::{ConnectInfo, Multipart, State};
use axum::Json;
use partition_core::{Document, Element, PartitionOptions, PDF_CONTENT_TYPE};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ServerError;
use crate::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub healthcheck: &'static str,
}

/// Handler: GET /healthcheck
pub async fn handle_healthcheck() -> Json<HealthResponse> {
    Json(HealthResponse {
        healthcheck: "HEALTHCHECK STATUS: EVERYTHING OK!",
    })
}

/// One element list per file; a lone file is returned unwrapped
#[derive(Serialize)]
#[serde(untagged)]
pub enum PartitionResponse {
    Single(Vec<Element>),
    Multiple(Vec<Vec<Element>>),
}

/// Handler: POST /general/v0/general
pub async fn handle_partition(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    multipart: Multipart,
) -> Result<Json<PartitionResponse>, ServerError> {
    let client = connect_info.map(|ConnectInfo(addr)| addr.ip());
    state.service.admit(client)?;

    let (files, options) = read_form(multipart).await?;
    if files.is_empty() {
        return Err(ServerError::InvalidRequest(
            "Request parameter \"files\" is required.".into(),
        ));
    }

    info!(
        files = files.len(),
        strategy = options.strategy.as_str(),
        "Partition request"
    );

    let mut results = Vec::with_capacity(files.len());
    for document in files {
        let elements = state
            .service
            .partition_document(document, options.clone())
            .await?;
        results.push(elements);
    }

    let response = if results.len() == 1 {
        PartitionResponse::Single(results.remove(0))
    } else {
        PartitionResponse::Multiple(results)
    };
    Ok(Json(response))
}

/// Collect uploaded files and form parameters
async fn read_form(
    mut multipart: Multipart,
) -> Result<(Vec<Document>, PartitionOptions), ServerError> {
    let mut files = Vec::new();
    let mut options = PartitionOptions::default();
    let mut ocr_languages = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::InvalidRequest(format!("Malformed form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "files" {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let content_type = detect_content_type(&filename, field.content_type());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::InvalidRequest(format!("Failed to read file: {}", e)))?;
            debug!(%filename, %content_type, size = bytes.len(), "Received file");
            files.push(Document::new(filename, content_type, bytes.to_vec()));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ServerError::InvalidRequest(format!("Failed to read field: {}", e)))?;

        match name.as_str() {
            "strategy" => options.strategy = value.trim().parse()?,
            "include_page_breaks" => options.include_page_breaks = parse_bool(&name, &value)?,
            "coordinates" => options.coordinates = parse_bool(&name, &value)?,
            "xml_keep_tags" => options.xml_keep_tags = parse_bool(&name, &value)?,
            "encoding" => options.encoding = Some(value.trim().to_string()),
            "ocr_languages" => ocr_languages.push(value.trim().to_string()),
            "skip_infer_table_types" => options.skip_infer_table_types.push(value.trim().to_string()),
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    if !ocr_languages.is_empty() {
        options.ocr_languages = ocr_languages;
    }

    Ok((files, options))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ServerError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(ServerError::InvalidRequest(format!(
            "Invalid value for {}: {}",
            name, other
        ))),
    }
}

/// Use the declared content type, falling back to the file extension when
/// the client sent none or a generic one
fn detect_content_type(filename: &str, declared: Option<&str>) -> String {
    match declared {
        Some(declared) if !declared.is_empty() && declared != "application/octet-stream" => {
            declared.to_string()
        }
        _ => {
            let extension = Path::new(filename)
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase);
            match extension.as_deref() {
                Some("pdf") => PDF_CONTENT_TYPE,
                Some("txt") | Some("text") => "text/plain",
                Some("md") | Some("markdown") => "text/markdown",
                Some("csv") => "text/csv",
                Some("rst") => "text/x-rst",
                _ => "application/octet-stream",
            }
            .to_string()
        }
    }
}
