//! Metric -> widget data transforms. All builders are pure: same metrics and
//! props in, same payload out.
//!
//! A builder may attach a `props` block to its payload to force a display
//! property (alert color, gauge range). That block applies to the single push
//! it travels with and never flows back into the stored settings.

use hudpush_proto::{BarItem, KeyValueItem, PropMap, WidgetData};
use serde_json::Value;

use crate::props::Props;
use crate::types::{Metrics, ProcessUsage, BYTES_PER_GB, BYTES_PER_MB};
use crate::widgets::WidgetKind;

pub const ALERT_COLOR: &str = "#ef4444";
pub const DEFAULT_ALERT_THRESHOLD: f64 = 80.0;
pub const DEFAULT_MAX_PROCS: usize = 5;

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn overrides<const N: usize>(pairs: [(&str, Value); N]) -> PropMap {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Build the payload for a widget of `kind`.
pub fn build(kind: WidgetKind, metrics: &Metrics, props: &Props) -> WidgetData {
    match kind {
        WidgetKind::CoreSparkline => sparkline(metrics.core_pct as f64, props),
        WidgetKind::VramGauge => vram_gauge(metrics.mem_used, metrics.mem_total, props),
        WidgetKind::Stats => stats(metrics, props),
        WidgetKind::Processes => process_bars(&metrics.processes, metrics.mem_total, props),
        WidgetKind::PcieText => rate_text(metrics.pcie_rx_kbps.map(f64::from), props),
    }
}

/// Sparkline point; turns red strictly above `alert_threshold`.
pub fn sparkline(value: f64, props: &Props) -> WidgetData {
    let threshold = props
        .number("alert_threshold")
        .unwrap_or(DEFAULT_ALERT_THRESHOLD);
    let props = (value > threshold).then(|| overrides([("color", Value::from(ALERT_COLOR))]));
    WidgetData::Sparkline {
        value,
        display_value: Some(format!("{value:.0}%")),
        props,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GaugeUnit {
    Percent,
    Gigabytes,
}

/// VRAM gauge. `unit` picks both the value and the range: `%` is 0..100,
/// `GB` is 0..total GiB. The effective unit and range are echoed back so the
/// renderer does not have to derive them.
pub fn vram_gauge(used: u64, total: u64, props: &Props) -> WidgetData {
    let unit = match props.str("unit") {
        Some(u) if u.eq_ignore_ascii_case("GB") => GaugeUnit::Gigabytes,
        _ => GaugeUnit::Percent,
    };
    let (value, max, label, unit_str) = match unit {
        GaugeUnit::Percent => {
            let pct = if total == 0 {
                0.0
            } else {
                used as f64 / total as f64 * 100.0
            };
            let v = round1(pct.clamp(0.0, 100.0));
            (v, 100.0, format!("{v:.1}%"), "%")
        }
        GaugeUnit::Gigabytes => {
            let max = round1(total as f64 / BYTES_PER_GB);
            let v = round1((used as f64 / BYTES_PER_GB).clamp(0.0, max));
            (v, max, format!("{v:.1} / {max:.0} GB"), "GB")
        }
    };
    WidgetData::Gauge {
        value,
        label,
        props: Some(overrides([
            ("unit", Value::from(unit_str)),
            ("min", Value::from(0)),
            ("max", Value::from(max)),
        ])),
    }
}

/// Top processes by VRAM, largest first. Equal usage keeps driver order.
pub fn process_bars(processes: &[ProcessUsage], mem_total: u64, props: &Props) -> WidgetData {
    if !props.bool("show_procs").unwrap_or(true) {
        return WidgetData::BarList {
            items: Vec::new(),
            props: None,
        };
    }
    let max_items = props
        .number("max_procs")
        .map(|n| n.max(1.0) as usize)
        .unwrap_or(DEFAULT_MAX_PROCS);
    let total_mb = mem_total as f64 / BYTES_PER_MB as f64;

    let mut ranked: Vec<&ProcessUsage> = processes.iter().collect();
    ranked.sort_by(|a, b| b.vram_mb().cmp(&a.vram_mb()));

    let items = ranked
        .into_iter()
        .take(max_items)
        .map(|p| {
            let mb = p.vram_mb();
            let percent = if total_mb > 0.0 {
                round1(mb as f64 / total_mb * 100.0)
            } else {
                0.0
            };
            BarItem {
                label: p.name.clone(),
                percent,
                value: format!("{mb} MB"),
            }
        })
        .collect();
    WidgetData::BarList { items, props: None }
}

fn row(key: &str, value: String, icon: &str) -> KeyValueItem {
    KeyValueItem {
        key: key.to_string(),
        value,
        icon: Some(icon.to_string()),
    }
}

/// VRAM, Temp, Power, Fan, in that order. Absent readings drop their row.
pub fn stats(m: &Metrics, props: &Props) -> WidgetData {
    let mut items = vec![row(
        "VRAM",
        format!("{:.1}/{:.0} GB", m.mem_used_gb(), m.mem_total_gb()),
        "memory-stick",
    )];
    if let Some(t) = m.temp_c {
        items.push(row("Temp", format!("{t}°C"), "thermometer"));
    }
    if let Some(p) = m.power_w {
        let value = match m.power_limit_w {
            Some(limit) if limit > 0.0 => format!("{p:.0}/{limit:.0} W"),
            _ => format!("{p:.0} W"),
        };
        items.push(row("Power", value, "zap"));
    }
    if let Some(f) = m.fan_pct {
        items.push(row("Fan", format!("{f}%"), "wind"));
    }
    let props = props
        .str("layout")
        .map(|layout| overrides([("layout", Value::from(layout))]));
    WidgetData::KeyValue { items, props }
}

/// Throughput as text; the input is KB/s and `unit` may ask for MB/s.
pub fn rate_text(kbps: Option<f64>, props: &Props) -> WidgetData {
    let value = match kbps {
        None => "--".to_string(),
        Some(k) => match props.str("unit") {
            Some("MB/s") => format!("{:.2} MB/s", k / 1024.0),
            _ => format!("{k:.0} KB/s"),
        },
    };
    WidgetData::Text {
        value,
        label: Some("PCIe RX".into()),
        props: None,
    }
}
