//! Snapshot types produced by the collector and consumed by the payload builders.

use serde::Serialize;

/// A telemetry source discovered at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub index: u32,
    pub name: String,
}

impl Device {
    /// Name without the vendor marketing prefix, used in widget titles.
    pub fn short_name(&self) -> String {
        self.name
            .replace("NVIDIA GeForce ", "")
            .replace("NVIDIA ", "")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessUsage {
    pub pid: u32,
    pub name: String,
    pub vram_bytes: u64,
}

impl ProcessUsage {
    /// VRAM in whole megabytes, floor-divided.
    pub fn vram_mb(&self) -> u64 {
        self.vram_bytes / BYTES_PER_MB
    }
}

pub const BYTES_PER_MB: u64 = 1024 * 1024;
pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// One device, one cycle. Optional readings stay `None` when the driver
/// could not provide them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub core_pct: u32, // 0..100
    pub mem_pct: u32,  // memory controller utilization, 0..100
    pub mem_used: u64, // bytes
    pub mem_total: u64,
    pub temp_c: Option<u32>,
    pub power_w: Option<f64>,
    pub power_limit_w: Option<f64>,
    pub fan_pct: Option<u32>,
    pub pcie_rx_kbps: Option<u32>,
    pub processes: Vec<ProcessUsage>,
}

impl Metrics {
    pub fn mem_used_gb(&self) -> f64 {
        self.mem_used as f64 / BYTES_PER_GB
    }

    pub fn mem_total_gb(&self) -> f64 {
        self.mem_total as f64 / BYTES_PER_GB
    }
}
