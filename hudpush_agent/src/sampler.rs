//! Poll loop: enumerate once, register every widget, then sample -> build ->
//! push -> merge for each device and widget, strictly in order, forever.

use std::future::Future;

use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::error::SourceError;
use crate::gpu::{enumerate, TelemetrySource};
use crate::metrics::Collector;
use crate::payload::build;
use crate::procname::ProcessNames;
use crate::props::ConfigSync;
use crate::push::{PushClient, PushTransport};
use crate::types::{Device, Metrics};
use crate::widgets::{catalog, WidgetRegistry, WidgetSpec};
use hudpush_proto::WidgetData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Registering,
    Polling,
    ShuttingDown,
}

/// Outcome counters for one pass over all devices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub devices_sampled: usize,
    pub devices_skipped: usize,
    pub pushes_ok: usize,
    pub pushes_failed: usize,
}

pub struct Sidecar<S, N, T> {
    source: S,
    names: N,
    collector: Collector,
    client: PushClient<T>,
    registry: WidgetRegistry,
    settings: ConfigSync,
    prefix: String,
    devices: Vec<(Device, Vec<WidgetSpec>)>,
    phase: Phase,
}

impl<S, N, T> Sidecar<S, N, T>
where
    S: TelemetrySource,
    N: ProcessNames,
    T: PushTransport,
{
    pub fn new(source: S, names: N, client: PushClient<T>, prefix: impl Into<String>) -> Self {
        Self {
            source,
            names,
            collector: Collector::new(),
            client,
            registry: WidgetRegistry::new(),
            settings: ConfigSync::new(),
            prefix: prefix.into(),
            devices: Vec::new(),
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter().map(|(d, _)| d)
    }

    pub fn widgets(&self) -> impl Iterator<Item = &WidgetSpec> {
        self.devices.iter().flat_map(|(_, w)| w.iter())
    }

    pub fn settings(&self) -> &ConfigSync {
        &self.settings
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn client(&self) -> &PushClient<T> {
        &self.client
    }

    /// Discover devices and lay out their widgets. A fatal source error moves
    /// straight to `ShuttingDown`.
    pub fn start(&mut self) -> Result<(), SourceError> {
        match enumerate(&self.source) {
            Ok(devices) => {
                self.devices = devices
                    .into_iter()
                    .map(|d| {
                        let widgets = catalog(&self.prefix, &d);
                        (d, widgets)
                    })
                    .collect();
                Ok(())
            }
            Err(e) => {
                self.phase = Phase::ShuttingDown;
                Err(e)
            }
        }
    }

    /// Register every widget and seed its settings. A failed registration
    /// leaves that widget at schema defaults and does not block the others.
    pub async fn register_all(&mut self) {
        self.phase = Phase::Registering;
        info!("registering widgets with {} device(s)", self.devices.len());
        for (_, widgets) in &self.devices {
            for spec in widgets {
                let placeholder = WidgetData::placeholder(spec.visual_type());
                let props = self
                    .registry
                    .register(&self.client, spec, placeholder)
                    .await;
                self.settings.seed(&spec.id, &spec.schema, props);
            }
        }
        self.phase = Phase::Polling;
    }

    /// One pass: for each device in enumeration order, sample once and push
    /// every widget. Nothing here is fatal.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        for (device, widgets) in &self.devices {
            let metrics = match self.collector.sample(&self.source, &mut self.names, device) {
                Ok(m) => m,
                Err(e) => {
                    warn!("{e}; skipping this cycle");
                    report.devices_skipped += 1;
                    continue;
                }
            };
            report.devices_sampled += 1;

            for spec in widgets {
                let props = self.settings.get(&spec.id);
                let data = build(spec.kind, &metrics, &props);
                match self.registry.try_push(&self.client, spec, data).await {
                    Ok(resp) => {
                        self.settings.merge(&spec.id, resp);
                        report.pushes_ok += 1;
                    }
                    Err(e) => {
                        warn!("{}: push failed: {e}", spec.id);
                        report.pushes_failed += 1;
                    }
                }
            }
            info!("{}", summary(device, &metrics));
        }
        report
    }

    /// Register, then poll every `interval` until the future is dropped.
    pub async fn run(&mut self, interval: Duration) {
        if self.phase != Phase::Polling {
            self.register_all().await;
        }
        info!(
            "monitoring {} GPU(s) every {:?}",
            self.devices.len(),
            interval
        );
        loop {
            self.run_cycle().await;
            sleep(interval).await;
        }
    }

    /// Register and poll until `stop` resolves. `stop` is polled before any
    /// work starts, so a signal future installs its handler before the first
    /// push can block, and cancellation leaves `self` intact for a clean drop.
    pub async fn run_until<F: Future>(&mut self, interval: Duration, stop: F) {
        tokio::pin!(stop);
        tokio::select! {
            biased;
            _ = &mut stop => {}
            _ = self.run(interval) => {}
        }
        info!("stopping during {:?}", self.phase);
        self.shutdown();
    }

    pub fn shutdown(&mut self) {
        self.phase = Phase::ShuttingDown;
    }
}

fn summary(device: &Device, m: &Metrics) -> String {
    let temp = m
        .temp_c
        .map(|t| format!("{t}°C"))
        .unwrap_or_else(|| "--".into());
    let power = m
        .power_w
        .map(|p| format!("{p:.0}W"))
        .unwrap_or_else(|| "--".into());
    format!(
        "GPU[{}] core={:3}% | VRAM={:.1}/{:.0}GB | temp={} | pwr={} | procs={}",
        device.index,
        m.core_pct,
        m.mem_used_gb(),
        m.mem_total_gb(),
        temp,
        power,
        m.processes.len()
    )
}
