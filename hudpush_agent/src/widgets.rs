//! Widget catalog and idempotent registration.

use std::collections::HashMap;

use hudpush_proto::{PropMap, PushRequest, SchemaField, Template, VisualType, WidgetData};
use serde_json::json;
use tracing::{info, warn};

use crate::error::TransportError;
use crate::props::Props;
use crate::push::{PushClient, PushTransport};
use crate::types::Device;

/// What a widget shows; decides both its visual type and its builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    /// Core utilization trend.
    CoreSparkline,
    /// VRAM fill level.
    VramGauge,
    /// VRAM / Temp / Power / Fan rows.
    Stats,
    /// Top processes by VRAM.
    Processes,
    /// PCIe receive throughput.
    PcieText,
}

impl WidgetKind {
    pub fn visual_type(&self) -> VisualType {
        match self {
            WidgetKind::CoreSparkline => VisualType::Sparkline,
            WidgetKind::VramGauge => VisualType::Gauge,
            WidgetKind::Stats => VisualType::KeyValue,
            WidgetKind::Processes => VisualType::BarList,
            WidgetKind::PcieText => VisualType::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSpec {
    pub id: String,
    pub kind: WidgetKind,
    pub title: String,
    pub template_props: PropMap,
    pub schema: Vec<SchemaField>,
}

impl WidgetSpec {
    pub fn visual_type(&self) -> VisualType {
        self.kind.visual_type()
    }

    pub fn template(&self) -> Template {
        Template {
            kind: self.visual_type(),
            title: self.title.clone(),
            props: self.template_props.clone(),
        }
    }

    /// Registration request: template, schema (when the widget has settings) and data.
    pub fn registration(&self, data: WidgetData) -> PushRequest {
        PushRequest {
            module_id: self.id.clone(),
            template: Some(self.template()),
            schema: (!self.schema.is_empty()).then(|| self.schema.clone()),
            data: Some(data),
        }
    }
}

fn props_of(v: serde_json::Value) -> PropMap {
    match v {
        serde_json::Value::Object(m) => m,
        _ => PropMap::new(),
    }
}

/// The widgets published for one device. Ids are `{prefix}.{index}[.suffix]`.
pub fn catalog(prefix: &str, device: &Device) -> Vec<WidgetSpec> {
    let base = format!("{prefix}.{}", device.index);
    let short = device.short_name();
    vec![
        WidgetSpec {
            id: base.clone(),
            kind: WidgetKind::CoreSparkline,
            title: format!("{short} Core"),
            template_props: props_of(json!({"unit": "%", "maxPoints": 60})),
            schema: vec![SchemaField::number(
                "alert_threshold",
                "Alert Threshold (%)",
                80.0,
            )],
        },
        WidgetSpec {
            id: format!("{base}.vram"),
            kind: WidgetKind::VramGauge,
            title: format!("{short} VRAM"),
            template_props: props_of(json!({"min": 0, "max": 100, "unit": "%"})),
            schema: vec![SchemaField::select(
                "unit",
                "Display Unit",
                "%",
                &[("Percent", "%"), ("Gigabytes", "GB")],
            )],
        },
        WidgetSpec {
            id: format!("{base}.info"),
            kind: WidgetKind::Stats,
            title: format!("{short} Stats"),
            template_props: PropMap::new(),
            schema: vec![SchemaField::select(
                "layout",
                "Layout",
                "column",
                &[("Column", "column"), ("Row", "row")],
            )],
        },
        WidgetSpec {
            id: format!("{base}.procs"),
            kind: WidgetKind::Processes,
            title: format!("{short} Processes"),
            template_props: PropMap::new(),
            schema: vec![
                SchemaField::bool("show_procs", "Show Process Widget", true),
                SchemaField::number("max_procs", "Max Processes", 5.0),
            ],
        },
        WidgetSpec {
            id: format!("{base}.pcie"),
            kind: WidgetKind::PcieText,
            title: format!("{short} PCIe RX"),
            template_props: PropMap::new(),
            schema: vec![SchemaField::select(
                "unit",
                "Display Unit",
                "KB/s",
                &[("KB/s", "KB/s"), ("MB/s", "MB/s")],
            )],
        },
    ]
}

/// Tracks which widgets the dashboard has acknowledged, and with which template.
///
/// Until a registration round-trip succeeds, every push for that widget goes
/// out as a registration again; afterwards only data is sent.
#[derive(Debug, Default)]
pub struct WidgetRegistry {
    confirmed: HashMap<String, Template>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self, spec: &WidgetSpec) -> bool {
        self.confirmed
            .get(&spec.id)
            .is_some_and(|t| *t == spec.template())
    }

    /// The request to send for `spec` right now.
    pub fn request_for(&self, spec: &WidgetSpec, data: WidgetData) -> PushRequest {
        if self.is_registered(spec) {
            PushRequest::data(&spec.id, data)
        } else {
            spec.registration(data)
        }
    }

    /// Register `spec` and return its current props. Calling this again for an
    /// already registered widget with an unchanged template just pushes the
    /// data and returns whatever the dashboard currently holds.
    pub async fn register<T: PushTransport>(
        &mut self,
        client: &PushClient<T>,
        spec: &WidgetSpec,
        initial_data: WidgetData,
    ) -> Props {
        match self.try_push(client, spec, initial_data).await {
            Ok(props) => props,
            Err(e) => {
                warn!("{}: registration failed: {e}", spec.id);
                Props::new()
            }
        }
    }

    /// Push `data` for `spec`, registering first if still needed.
    pub async fn try_push<T: PushTransport>(
        &mut self,
        client: &PushClient<T>,
        spec: &WidgetSpec,
        data: WidgetData,
    ) -> Result<Props, TransportError> {
        let req = self.request_for(spec, data);
        let props = client.push(&req).await?;
        if req.is_registration() {
            info!(
                "registered {} ({}) props={:?}",
                spec.id,
                spec.title,
                props.as_map()
            );
            self.confirmed.insert(spec.id.clone(), spec.template());
        }
        Ok(props)
    }
}
