// gpu.rs
//! Telemetry source abstraction and the NVML-backed implementation.

use nvml_wrapper::enum_wrappers::device::{PcieUtilCounter, TemperatureSensor};
use nvml_wrapper::enums::device::UsedGpuMemory;
use nvml_wrapper::{Device as NvmlDevice, Nvml};
use tracing::{debug, info, warn};

use crate::error::{MetricReadError, SourceError};
use crate::types::Device;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utilization {
    pub gpu: u32,    // 0..100
    pub memory: u32, // 0..100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    pub used: u64,
    pub total: u64,
}

/// A process as reported by the driver; VRAM may be unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawProcess {
    pub pid: u32,
    pub vram_bytes: Option<u64>,
}

/// Per-device metric readers. Every reader may fail independently; callers
/// decide which failures are tolerable.
pub trait TelemetrySource {
    fn count(&self) -> Result<u32, SourceError>;
    fn name(&self, index: u32) -> Result<String, MetricReadError>;
    fn utilization(&self, index: u32) -> Result<Utilization, MetricReadError>;
    fn memory_info(&self, index: u32) -> Result<MemoryInfo, MetricReadError>;
    /// Celsius.
    fn temperature(&self, index: u32) -> Result<u32, MetricReadError>;
    /// Milliwatts.
    fn power_usage(&self, index: u32) -> Result<u32, MetricReadError>;
    /// Milliwatts.
    fn power_limit(&self, index: u32) -> Result<u32, MetricReadError>;
    /// Percent of maximum fan speed.
    fn fan_speed(&self, index: u32) -> Result<u32, MetricReadError>;
    /// KB/s received over PCIe.
    fn pcie_rx(&self, index: u32) -> Result<u32, MetricReadError>;
    fn running_processes(&self, index: u32) -> Result<Vec<RawProcess>, MetricReadError>;
}

/// Discover all devices of `source`, in driver order.
pub fn enumerate<S: TelemetrySource + ?Sized>(source: &S) -> Result<Vec<Device>, SourceError> {
    let count = source.count()?;
    if count == 0 {
        return Err(SourceError::NoSourceFound);
    }
    let devices: Vec<Device> = (0..count)
        .map(|index| {
            let name = source.name(index).unwrap_or_else(|e| {
                warn!("{e}; using generic name for device {index}");
                format!("GPU {index}")
            });
            Device { index, name }
        })
        .collect();
    info!("found {} GPU(s)", devices.len());
    for d in &devices {
        info!("  [{}] {}", d.index, d.name);
    }
    Ok(devices)
}

/// NVML session. NVML is shut down when this value is dropped, so holding it
/// for the lifetime of the poll loop releases the driver on every exit path.
pub struct NvmlSource {
    nvml: Nvml,
}

impl NvmlSource {
    pub fn init() -> Result<Self, SourceError> {
        let nvml = Nvml::init().map_err(|e| SourceError::Init(e.to_string()))?;
        debug!("NVML initialized");
        Ok(Self { nvml })
    }

    fn device(&self, index: u32, metric: &'static str) -> Result<NvmlDevice<'_>, MetricReadError> {
        self.nvml
            .device_by_index(index)
            .map_err(|e| MetricReadError::new(metric, e))
    }
}

impl Drop for NvmlSource {
    fn drop(&mut self) {
        debug!("releasing NVML");
    }
}

impl TelemetrySource for NvmlSource {
    fn count(&self) -> Result<u32, SourceError> {
        self.nvml
            .device_count()
            .map_err(|e| SourceError::Init(e.to_string()))
    }

    fn name(&self, index: u32) -> Result<String, MetricReadError> {
        self.device(index, "name")?
            .name()
            .map_err(|e| MetricReadError::new("name", e))
    }

    fn utilization(&self, index: u32) -> Result<Utilization, MetricReadError> {
        let u = self
            .device(index, "utilization")?
            .utilization_rates()
            .map_err(|e| MetricReadError::new("utilization", e))?;
        Ok(Utilization {
            gpu: u.gpu,
            memory: u.memory,
        })
    }

    fn memory_info(&self, index: u32) -> Result<MemoryInfo, MetricReadError> {
        let m = self
            .device(index, "memory")?
            .memory_info()
            .map_err(|e| MetricReadError::new("memory", e))?;
        Ok(MemoryInfo {
            used: m.used,
            total: m.total,
        })
    }

    fn temperature(&self, index: u32) -> Result<u32, MetricReadError> {
        self.device(index, "temperature")?
            .temperature(TemperatureSensor::Gpu)
            .map_err(|e| MetricReadError::new("temperature", e))
    }

    fn power_usage(&self, index: u32) -> Result<u32, MetricReadError> {
        self.device(index, "power")?
            .power_usage()
            .map_err(|e| MetricReadError::new("power", e))
    }

    fn power_limit(&self, index: u32) -> Result<u32, MetricReadError> {
        self.device(index, "power_limit")?
            .enforced_power_limit()
            .map_err(|e| MetricReadError::new("power_limit", e))
    }

    fn fan_speed(&self, index: u32) -> Result<u32, MetricReadError> {
        self.device(index, "fan")?
            .fan_speed(0)
            .map_err(|e| MetricReadError::new("fan", e))
    }

    fn pcie_rx(&self, index: u32) -> Result<u32, MetricReadError> {
        self.device(index, "pcie_rx")?
            .pcie_throughput(PcieUtilCounter::Receive)
            .map_err(|e| MetricReadError::new("pcie_rx", e))
    }

    fn running_processes(&self, index: u32) -> Result<Vec<RawProcess>, MetricReadError> {
        let procs = self
            .device(index, "processes")?
            .running_compute_processes()
            .map_err(|e| MetricReadError::new("processes", e))?;
        Ok(procs
            .into_iter()
            .map(|p| RawProcess {
                pid: p.pid,
                vram_bytes: match p.used_gpu_memory {
                    UsedGpuMemory::Used(b) => Some(b),
                    UsedGpuMemory::Unavailable => None,
                },
            })
            .collect())
    }
}
