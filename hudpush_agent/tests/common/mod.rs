//! In-memory stand-ins for the driver, the process table and the dashboard.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use hudpush_agent::error::{MetricReadError, NameResolutionError, SourceError, TransportError};
use hudpush_agent::gpu::{MemoryInfo, RawProcess, TelemetrySource, Utilization};
use hudpush_agent::procname::ProcessNames;
use hudpush_agent::push::PushTransport;
use hudpush_proto::{PushRequest, PushResponse};
use serde_json::Value;

pub const GIB: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FakeDevice {
    pub name: Option<String>,
    pub util: Option<(u32, u32)>,
    pub mem: Option<(u64, u64)>,
    pub temp: Option<u32>,
    pub power_mw: Option<u32>,
    pub limit_mw: Option<u32>,
    pub fan: Option<u32>,
    pub pcie: Option<u32>,
    pub procs: Option<Vec<RawProcess>>,
}

impl FakeDevice {
    pub fn healthy(name: &str) -> Self {
        Self {
            name: Some(name.into()),
            util: Some((42, 10)),
            mem: Some((6 * GIB, 24 * GIB)),
            temp: Some(61),
            power_mw: Some(215_000),
            limit_mw: Some(450_000),
            fan: Some(30),
            pcie: Some(2048),
            procs: Some(vec![RawProcess {
                pid: 100,
                vram_bytes: Some(512 * 1024 * 1024),
            }]),
        }
    }

    /// Only the mandatory readings work.
    pub fn bare(name: &str) -> Self {
        Self {
            name: Some(name.into()),
            util: Some((5, 1)),
            mem: Some((GIB, 8 * GIB)),
            temp: None,
            power_mw: None,
            limit_mw: None,
            fan: None,
            pcie: None,
            procs: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeGpu {
    pub devices: RefCell<Vec<FakeDevice>>,
    pub count_error: bool,
    /// Set when the session is dropped, like NVML shutting down.
    pub released: Rc<Cell<bool>>,
}

impl FakeGpu {
    pub fn new(devices: Vec<FakeDevice>) -> Self {
        Self {
            devices: RefCell::new(devices),
            count_error: false,
            released: Rc::new(Cell::new(false)),
        }
    }

    fn read<T>(
        &self,
        index: u32,
        metric: &'static str,
        f: impl Fn(&FakeDevice) -> Option<T>,
    ) -> Result<T, MetricReadError> {
        self.devices
            .borrow()
            .get(index as usize)
            .and_then(f)
            .ok_or_else(|| MetricReadError::new(metric, "not supported"))
    }
}

impl Drop for FakeGpu {
    fn drop(&mut self) {
        self.released.set(true);
    }
}

impl TelemetrySource for FakeGpu {
    fn count(&self) -> Result<u32, SourceError> {
        if self.count_error {
            return Err(SourceError::Init("driver not loaded".into()));
        }
        Ok(self.devices.borrow().len() as u32)
    }
    fn name(&self, index: u32) -> Result<String, MetricReadError> {
        self.read(index, "name", |d| d.name.clone())
    }
    fn utilization(&self, index: u32) -> Result<Utilization, MetricReadError> {
        self.read(index, "utilization", |d| {
            d.util.map(|(gpu, memory)| Utilization { gpu, memory })
        })
    }
    fn memory_info(&self, index: u32) -> Result<MemoryInfo, MetricReadError> {
        self.read(index, "memory", |d| {
            d.mem.map(|(used, total)| MemoryInfo { used, total })
        })
    }
    fn temperature(&self, index: u32) -> Result<u32, MetricReadError> {
        self.read(index, "temperature", |d| d.temp)
    }
    fn power_usage(&self, index: u32) -> Result<u32, MetricReadError> {
        self.read(index, "power", |d| d.power_mw)
    }
    fn power_limit(&self, index: u32) -> Result<u32, MetricReadError> {
        self.read(index, "power_limit", |d| d.limit_mw)
    }
    fn fan_speed(&self, index: u32) -> Result<u32, MetricReadError> {
        self.read(index, "fan", |d| d.fan)
    }
    fn pcie_rx(&self, index: u32) -> Result<u32, MetricReadError> {
        self.read(index, "pcie_rx", |d| d.pcie)
    }
    fn running_processes(&self, index: u32) -> Result<Vec<RawProcess>, MetricReadError> {
        self.read(index, "processes", |d| d.procs.clone())
    }
}

/// Fixed pid -> name table; unknown pids fail to resolve.
#[derive(Debug, Default)]
pub struct FakeNames {
    pub names: HashMap<u32, String>,
    pub lookups: usize,
}

impl FakeNames {
    pub fn with(pairs: &[(u32, &str)]) -> Self {
        Self {
            names: pairs.iter().map(|(p, n)| (*p, n.to_string())).collect(),
            lookups: 0,
        }
    }
}

impl ProcessNames for FakeNames {
    fn lookup(&mut self, pid: u32) -> Result<String, NameResolutionError> {
        self.lookups += 1;
        self.names.get(&pid).cloned().ok_or(NameResolutionError {
            pid,
            reason: "gone".into(),
        })
    }
}

/// Records every request. Scripted outcomes are consumed in order; once the
/// script runs out every request succeeds with `default_props`.
#[derive(Debug, Default)]
pub struct FakeDashboard {
    pub sent: RefCell<Vec<PushRequest>>,
    pub script: RefCell<VecDeque<Result<Value, TransportError>>>,
    pub default_props: RefCell<Option<Value>>,
    /// Fail every request whose module id is in this list.
    pub down_for: RefCell<Vec<String>>,
    pub calls: Cell<usize>,
    /// Every request takes this long to answer.
    pub latency: Cell<Duration>,
}

impl FakeDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, outcome: Result<Value, TransportError>) {
        self.script.borrow_mut().push_back(outcome);
    }

    pub fn requests_for(&self, id: &str) -> Vec<PushRequest> {
        self.sent
            .borrow()
            .iter()
            .filter(|r| r.module_id == id)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.sent.borrow_mut().clear();
    }
}

impl PushTransport for FakeDashboard {
    async fn send(&self, req: &PushRequest) -> Result<PushResponse, TransportError> {
        self.calls.set(self.calls.get() + 1);
        self.sent.borrow_mut().push(req.clone());
        let latency = self.latency.get();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.down_for.borrow().contains(&req.module_id) {
            return Err(TransportError::Status(503));
        }
        let outcome = self
            .script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_props.borrow().clone().unwrap_or(Value::Null)));
        outcome.map(|props| PushResponse {
            status: Some("ok".into()),
            props: Some(props),
        })
    }
}
