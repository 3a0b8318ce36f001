//! Partition Server
//!
//! Splits uploaded documents into elements. Provides REST API endpoints for:
//!
//! - Health checks
//! - Partitioning one or more files per request
//!
//! ## Parallel mode
//!
//! With `PARTITION_PARALLEL_MODE_ENABLED=true`, PDFs are cut into page-range
//! chunks and each chunk is POSTed to `PARTITION_PARALLEL_MODE_URL`, usually
//! a pool of instances of this same server. Results are merged back into one
//! element list in page order.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use partition_core::{
    HttpWorkerClient, MemoryFloorGate, ParallelConfig, PartitionService, TextLayerPartitioner,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;

use api::{handle_healthcheck, handle_partition};

/// Largest accepted request body
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Command-line arguments for the partition server
#[derive(Parser, Debug)]
#[command(name = "partition-api")]
#[command(about = "Document partitioning server with parallel page-range dispatch")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: PartitionService,
}

/// Routes and middleware, without the listener
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthcheck", get(handle_healthcheck))
        .route("/general/v0/general", post(handle_partition))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ParallelConfig::from_env()?;
    let worker = HttpWorkerClient::new(config.request_timeout)?;
    let gate = MemoryFloorGate::new(config.memory_floor_mb);

    if config.enabled {
        info!(
            worker_url = config.worker_url.as_deref().unwrap_or_default(),
            pool_size = config.pool_size,
            max_attempts = config.max_attempts,
            "Parallel mode enabled"
        );
    }

    let service = PartitionService::new(
        config,
        Arc::new(TextLayerPartitioner::new()),
        Arc::new(worker),
        Arc::new(gate),
    )?;
    let app = build_router(AppState { service });

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
