//! User-editable widget settings as last echoed back by the dashboard.

use std::collections::HashMap;

use hudpush_proto::{PropMap, SchemaField};
use serde_json::Value;
use tracing::debug;

/// `setting name -> value` for one widget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props(PropMap);

impl Props {
    pub fn new() -> Self {
        Self(PropMap::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Numbers may come back from the settings form as strings.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.as_str()
    }

    pub fn as_map(&self) -> &PropMap {
        &self.0
    }

    fn defaults_of(schema: &[SchemaField]) -> Self {
        Self(
            schema
                .iter()
                .map(|f| (f.name.clone(), f.default.clone()))
                .collect(),
        )
    }
}

impl From<PropMap> for Props {
    fn from(map: PropMap) -> Self {
        Self(map)
    }
}

#[derive(Debug, Default)]
struct Entry {
    defaults: Props,
    current: Props,
}

/// Owns the known `Props` of every registered widget.
///
/// Stored values are replaced wholesale by each non-empty push response;
/// schema defaults are only applied when reading.
#[derive(Debug, Default)]
pub struct ConfigSync {
    widgets: HashMap<String, Entry>,
}

impl ConfigSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a widget's schema and the props returned by its registration.
    pub fn seed(&mut self, widget_id: &str, schema: &[SchemaField], props: Props) {
        let entry = self.widgets.entry(widget_id.to_string()).or_default();
        entry.defaults = Props::defaults_of(schema);
        if !props.is_empty() {
            entry.current = props;
        }
    }

    /// Replace the stored props with `response`. An empty response means
    /// "no update" and leaves the previous value in place. Returns whether
    /// anything was replaced.
    pub fn merge(&mut self, widget_id: &str, response: Props) -> bool {
        if response.is_empty() {
            debug!("{widget_id}: no props in response, keeping previous settings");
            return false;
        }
        let entry = self.widgets.entry(widget_id.to_string()).or_default();
        if entry.current != response {
            debug!("{widget_id}: settings updated ({} keys)", response.len());
        }
        entry.current = response;
        true
    }

    /// Last known props, with missing keys filled from the schema defaults.
    pub fn get(&self, widget_id: &str) -> Props {
        let Some(entry) = self.widgets.get(widget_id) else {
            return Props::new();
        };
        let mut out = entry.current.clone();
        for (k, v) in entry.defaults.as_map() {
            if !out.0.contains_key(k) {
                out.0.insert(k.clone(), v.clone());
            }
        }
        out
    }

    /// Stored props without defaults applied.
    pub fn stored(&self, widget_id: &str) -> Option<&Props> {
        self.widgets.get(widget_id).map(|e| &e.current)
    }
}
