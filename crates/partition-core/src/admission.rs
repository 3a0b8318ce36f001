//! Pre-admission memory check
//!
//! Requests are turned away before any work starts when free memory is
//! below the configured floor. Traffic from the internal networks is always
//! admitted so sibling workers can keep draining chunks under load.

use std::net::IpAddr;

use sysinfo::System;

use crate::error::PartitionError;

/// Source prefixes that bypass the memory floor
const INTERNAL_PREFIXES: &[[u8; 2]] = &[[10, 4], [10, 5]];

pub trait AdmissionGate: Send + Sync {
    /// `Ok(())` to admit, [`PartitionError::AdmissionRejected`] to turn away
    fn admit(&self, client: Option<IpAddr>) -> Result<(), PartitionError>;
}

/// Reads available host memory on every check
pub struct MemoryFloorGate {
    floor_mb: u64,
    available_mb: Box<dyn Fn() -> u64 + Send + Sync>,
}

impl MemoryFloorGate {
    pub fn new(floor_mb: u64) -> Self {
        Self::with_probe(floor_mb, host_available_mb)
    }

    /// Use a custom memory probe instead of the host's
    pub fn with_probe<F>(floor_mb: u64, probe: F) -> Self
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        Self {
            floor_mb,
            available_mb: Box::new(probe),
        }
    }
}

impl AdmissionGate for MemoryFloorGate {
    fn admit(&self, client: Option<IpAddr>) -> Result<(), PartitionError> {
        if self.floor_mb == 0 || client.is_some_and(is_internal) {
            return Ok(());
        }

        let available = (self.available_mb)();
        if available < self.floor_mb {
            tracing::warn!(
                available_mb = available,
                floor_mb = self.floor_mb,
                "Rejecting request, free memory below floor"
            );
            return Err(PartitionError::AdmissionRejected);
        }
        Ok(())
    }
}

/// Admits everything
pub struct AlwaysAdmit;

impl AdmissionGate for AlwaysAdmit {
    fn admit(&self, _client: Option<IpAddr>) -> Result<(), PartitionError> {
        Ok(())
    }
}

fn is_internal(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            INTERNAL_PREFIXES
                .iter()
                .any(|prefix| octets[..2] == prefix[..])
        }
        IpAddr::V6(v6) => v6.to_ipv4_mapped().is_some_and(|v4| is_internal(IpAddr::V4(v4))),
    }
}

fn host_available_mb() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.available_memory() / (1024 * 1024)
}
