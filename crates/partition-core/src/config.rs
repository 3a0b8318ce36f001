//! Parallel-mode configuration
//!
//! Read once from the environment when the service starts and passed down
//! as an immutable value. Nothing below the service reads process state.

use std::str::FromStr;
use std::time::Duration;

use crate::chunker::ChunkSizing;
use crate::error::PartitionError;

pub const ENV_PARALLEL_ENABLED: &str = "PARTITION_PARALLEL_MODE_ENABLED";
pub const ENV_PARALLEL_URL: &str = "PARTITION_PARALLEL_MODE_URL";
pub const ENV_PARALLEL_THREADS: &str = "PARTITION_PARALLEL_MODE_THREADS";
pub const ENV_PARALLEL_SPLIT_SIZE: &str = "PARTITION_PARALLEL_MODE_SPLIT_SIZE";
pub const ENV_RETRY_ATTEMPTS: &str = "PARTITION_PARALLEL_RETRY_ATTEMPTS";
pub const ENV_RETRY_BACKOFF_TIME: &str = "PARTITION_PARALLEL_RETRY_BACKOFF_TIME";
pub const ENV_REQUEST_TIMEOUT: &str = "PARTITION_PARALLEL_REQUEST_TIMEOUT";
pub const ENV_MEMORY_FREE_MINIMUM_MB: &str = "PARTITION_MEMORY_FREE_MINIMUM_MB";

#[derive(Debug, Clone, PartialEq)]
pub struct ParallelConfig {
    /// Split PDFs and dispatch the pieces to workers
    pub enabled: bool,
    /// Worker endpoint each chunk is POSTed to
    pub worker_url: Option<String>,
    /// Maximum chunks in flight at once
    pub pool_size: usize,
    /// How documents are cut into chunks
    pub sizing: ChunkSizing,
    /// Total attempts per chunk, including the first (1 = no retry)
    pub max_attempts: u32,
    /// Base delay between attempts; doubles on each further retry
    pub backoff_base: Duration,
    /// Per-request timeout on the worker transport
    pub request_timeout: Duration,
    /// Minimum free memory before requests are admitted (0 = disabled)
    pub memory_floor_mb: u64,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            worker_url: None,
            pool_size: 1,
            sizing: ChunkSizing::PagesPerChunk(1),
            max_attempts: 1,
            backoff_base: Duration::from_secs(1),
            request_timeout: Duration::from_secs(300),
            memory_floor_mb: 0,
        }
    }
}

impl ParallelConfig {
    /// Build from the process environment
    pub fn from_env() -> Result<Self, PartitionError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PartitionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let enabled = match lookup(ENV_PARALLEL_ENABLED) {
            Some(v) => parse_bool(ENV_PARALLEL_ENABLED, &v)?,
            None => defaults.enabled,
        };
        let worker_url = lookup(ENV_PARALLEL_URL).filter(|u| !u.trim().is_empty());

        let pool_size: usize = parse_or(&lookup, ENV_PARALLEL_THREADS, defaults.pool_size)?;
        let split_size: u32 = parse_or(&lookup, ENV_PARALLEL_SPLIT_SIZE, 1)?;
        let max_attempts: u32 = parse_or(&lookup, ENV_RETRY_ATTEMPTS, defaults.max_attempts)?;
        let backoff_secs: f64 = parse_or(
            &lookup,
            ENV_RETRY_BACKOFF_TIME,
            defaults.backoff_base.as_secs_f64(),
        )?;
        let timeout_secs: f64 = parse_or(
            &lookup,
            ENV_REQUEST_TIMEOUT,
            defaults.request_timeout.as_secs_f64(),
        )?;
        let memory_floor_mb: u64 =
            parse_or(&lookup, ENV_MEMORY_FREE_MINIMUM_MB, defaults.memory_floor_mb)?;

        let config = Self {
            enabled,
            worker_url,
            pool_size,
            sizing: ChunkSizing::PagesPerChunk(split_size),
            max_attempts,
            backoff_base: seconds(ENV_RETRY_BACKOFF_TIME, backoff_secs)?,
            request_timeout: seconds(ENV_REQUEST_TIMEOUT, timeout_secs)?,
            memory_floor_mb,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PartitionError> {
        if self.enabled && self.worker_url.is_none() {
            return Err(PartitionError::Config(format!(
                "{} is set but {} is missing",
                ENV_PARALLEL_ENABLED, ENV_PARALLEL_URL
            )));
        }
        if self.pool_size == 0 {
            return Err(PartitionError::Config(format!(
                "{} must be at least 1",
                ENV_PARALLEL_THREADS
            )));
        }
        if self.max_attempts == 0 {
            return Err(PartitionError::Config(format!(
                "{} must be at least 1",
                ENV_RETRY_ATTEMPTS
            )));
        }
        match self.sizing {
            ChunkSizing::PagesPerChunk(0) | ChunkSizing::ChunkCount(0) => {
                Err(PartitionError::Config("chunk size must be at least 1".into()))
            }
            _ => Ok(()),
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, PartitionError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| PartitionError::Config(format!("{}: cannot parse '{}'", key, raw))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, PartitionError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(PartitionError::Config(format!(
            "{}: expected a boolean, got '{}'",
            key, raw
        ))),
    }
}

fn seconds(key: &str, secs: f64) -> Result<Duration, PartitionError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| PartitionError::Config(format!("{}: invalid duration {}", key, secs)))
}
