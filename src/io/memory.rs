//! Physical memory queries
//!
//! Totals come from `sysinfo`, which covers linux, macOS and windows.

use crate::util::units::{bytes_to_gb, format_gb};
use crate::{DiskMemError, Result};
use serde::Serialize;
use sysinfo::System;

/// System memory snapshot, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryStatus {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemoryStatus {
    pub fn total_gb(&self) -> f64 {
        bytes_to_gb(self.total_bytes)
    }

    pub fn available_gb(&self) -> f64 {
        bytes_to_gb(self.available_bytes)
    }
}

/// Best-effort description of an installed memory module
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RamModule {
    pub manufacturer: String,
    pub capacity_gb: f64,
    pub clock: String,
}

impl RamModule {
    pub fn describe(&self) -> String {
        format!(
            "Manufacturer: {}, Capacity: {}, Speed: {}",
            self.manufacturer,
            format_gb(self.capacity_gb),
            self.clock
        )
    }
}

/// Current memory status of the machine
pub fn memory_status() -> Result<MemoryStatus> {
    let mut sys = System::new();
    sys.refresh_memory();
    status_from(&sys)
}

fn status_from(sys: &System) -> Result<MemoryStatus> {
    let total_bytes = sys.total_memory();
    if total_bytes == 0 {
        return Err(DiskMemError::Unsupported(
            "memory status is not available on this platform".to_string(),
        ));
    }

    Ok(MemoryStatus {
        total_bytes,
        available_bytes: sys.available_memory().min(total_bytes),
    })
}

/// Installed modules, as far as they can be determined.
///
/// Without vendor tooling only the total is known, so a single entry
/// with unknown manufacturer and clock is reported.
pub fn ram_modules() -> Result<Vec<RamModule>> {
    let status = memory_status()?;
    Ok(vec![RamModule {
        manufacturer: "Unknown".to_string(),
        capacity_gb: status.total_gb(),
        clock: "Unknown".to_string(),
    }])
}
