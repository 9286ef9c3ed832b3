//! Metrics collection: one `Metrics` snapshot per device per cycle.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::{MetricReadError, NameResolutionError, SampleAbortError};
use crate::gpu::TelemetrySource;
use crate::procname::ProcessNames;
use crate::types::{Device, Metrics, ProcessUsage};

fn mw_to_w(mw: u32) -> f64 {
    mw as f64 / 1000.0
}

/// Samples devices and remembers which recoverable failures were already
/// reported, so each one is a warning once and debug noise afterwards.
#[derive(Debug, Default)]
pub struct Collector {
    missing: HashSet<(u32, &'static str)>,
    unnamed: HashSet<u32>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    // Fold an optional reading into present/absent, noting why it went missing.
    fn optional<T>(&mut self, device: u32, r: Result<T, MetricReadError>) -> Option<T> {
        match r {
            Ok(v) => Some(v),
            Err(e) => {
                if self.missing.insert((device, e.metric)) {
                    warn!("GPU[{device}] {e}");
                } else {
                    debug!("GPU[{device}] {e}");
                }
                None
            }
        }
    }

    fn name_failed(&mut self, e: &NameResolutionError) {
        if self.unnamed.insert(e.pid) {
            warn!("{e}; showing pid instead");
        } else {
            debug!("{e}");
        }
    }

    /// Best-effort process name; falls back to the stringified pid.
    pub fn process_name<N: ProcessNames + ?Sized>(&mut self, names: &mut N, pid: u32) -> String {
        match names.lookup(pid) {
            Ok(name) if !name.is_empty() => name,
            Ok(_) => pid.to_string(),
            Err(e) => {
                self.name_failed(&e);
                pid.to_string()
            }
        }
    }

    /// Sample every reading of `device`.
    ///
    /// Utilization and memory are mandatory: if either fails the whole sample is
    /// aborted. Everything else degrades to `None` (or an empty process list).
    pub fn sample<S, N>(
        &mut self,
        source: &S,
        names: &mut N,
        device: &Device,
    ) -> Result<Metrics, SampleAbortError>
    where
        S: TelemetrySource + ?Sized,
        N: ProcessNames + ?Sized,
    {
        let index = device.index;
        let abort = |e| SampleAbortError {
            device: index,
            source: e,
        };

        let util = source.utilization(index).map_err(abort)?;
        let mem = source.memory_info(index).map_err(abort)?;

        let temp_c = self.optional(index, source.temperature(index));
        let power_w = self.optional(index, source.power_usage(index)).map(mw_to_w);
        let power_limit_w = self
            .optional(index, source.power_limit(index))
            .map(mw_to_w);
        let fan_pct = self.optional(index, source.fan_speed(index));
        let pcie_rx_kbps = self.optional(index, source.pcie_rx(index));

        let processes = self
            .optional(index, source.running_processes(index))
            .unwrap_or_default()
            .into_iter()
            .map(|p| ProcessUsage {
                pid: p.pid,
                name: self.process_name(names, p.pid),
                vram_bytes: p.vram_bytes.unwrap_or(0),
            })
            .collect();

        Ok(Metrics {
            core_pct: util.gpu.min(100),
            mem_pct: util.memory.min(100),
            mem_used: mem.used,
            mem_total: mem.total,
            temp_c,
            power_w,
            power_limit_w,
            fan_pct,
            pcie_rx_kbps,
            processes,
        })
    }

    /// Whether a missing `metric` on `device` has already been reported.
    pub fn reported(&self, device: u32, metric: &str) -> bool {
        self.missing.iter().any(|(d, m)| *d == device && *m == metric)
    }
}
