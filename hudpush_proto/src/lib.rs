//! Types that define the widget push protocol (`POST /api/widget`).
//! Keep this crate minimal and stable: it defines the wire format.
//!
//! A sidecar sends one [`PushRequest`] per widget update. The first request for
//! a `module_id` carries a [`Template`] and optionally a settings schema; every
//! later request only carries [`WidgetData`]. The service answers with a
//! [`PushResponse`] whose `props` hold the widget's current user settings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form `name -> value` mapping used for template props, user settings
/// and per-push display overrides.
pub type PropMap = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualType {
    Sparkline,
    Gauge,
    BarList,
    KeyValue,
    Text,
}

impl VisualType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualType::Sparkline => "sparkline",
            VisualType::Gauge => "gauge",
            VisualType::BarList => "bar-list",
            VisualType::KeyValue => "key-value",
            VisualType::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "type")]
    pub kind: VisualType,
    pub title: String,
    #[serde(default)]
    pub props: PropMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    Bool,
    Select,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// One user-editable setting exposed in the dashboard's settings form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub default: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
}

impl SchemaField {
    pub fn number(name: &str, label: &str, default: f64) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: FieldType::Number,
            default: Value::from(default),
            options: None,
        }
    }

    pub fn bool(name: &str, label: &str, default: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: FieldType::Bool,
            default: Value::Bool(default),
            options: None,
        }
    }

    /// `options` are `(label, value)` pairs; `default` should be one of the values.
    pub fn select(name: &str, label: &str, default: &str, options: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: FieldType::Select,
            default: Value::from(default),
            options: Some(
                options
                    .iter()
                    .map(|(l, v)| SelectOption {
                        label: l.to_string(),
                        value: v.to_string(),
                    })
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarItem {
    pub label: String,
    pub percent: f64,
    pub value: String, // e.g. "512 MB"
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyValueItem {
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Per-push data blob. Serialized untagged: the visual type lives in the
/// template, so the JSON shape alone identifies the variant to the renderer.
///
/// `props` is an override block applied by the renderer for this push only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WidgetData {
    Sparkline {
        value: f64,
        #[serde(rename = "displayValue", skip_serializing_if = "Option::is_none")]
        display_value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        props: Option<PropMap>,
    },
    Gauge {
        value: f64,
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        props: Option<PropMap>,
    },
    BarList {
        items: Vec<BarItem>,
        #[serde(skip_serializing_if = "Option::is_none")]
        props: Option<PropMap>,
    },
    KeyValue {
        items: Vec<KeyValueItem>,
        #[serde(skip_serializing_if = "Option::is_none")]
        props: Option<PropMap>,
    },
    Text {
        value: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        props: Option<PropMap>,
    },
}

impl WidgetData {
    /// Placeholder data sent alongside a registration, before the first sample.
    pub fn placeholder(kind: VisualType) -> Self {
        match kind {
            VisualType::Sparkline => WidgetData::Sparkline {
                value: 0.0,
                display_value: None,
                props: None,
            },
            VisualType::Gauge => WidgetData::Gauge {
                value: 0.0,
                label: String::new(),
                props: None,
            },
            VisualType::BarList => WidgetData::BarList {
                items: Vec::new(),
                props: None,
            },
            VisualType::KeyValue => WidgetData::KeyValue {
                items: Vec::new(),
                props: None,
            },
            VisualType::Text => WidgetData::Text {
                value: "--".into(),
                label: None,
                props: None,
            },
        }
    }

    pub fn visual_type(&self) -> VisualType {
        match self {
            WidgetData::Sparkline { .. } => VisualType::Sparkline,
            WidgetData::Gauge { .. } => VisualType::Gauge,
            WidgetData::BarList { .. } => VisualType::BarList,
            WidgetData::KeyValue { .. } => VisualType::KeyValue,
            WidgetData::Text { .. } => VisualType::Text,
        }
    }

    /// Display override block carried with this push, if any.
    pub fn props(&self) -> Option<&PropMap> {
        match self {
            WidgetData::Sparkline { props, .. }
            | WidgetData::Gauge { props, .. }
            | WidgetData::BarList { props, .. }
            | WidgetData::KeyValue { props, .. }
            | WidgetData::Text { props, .. } => props.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushRequest {
    pub module_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<Template>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<SchemaField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<WidgetData>,
}

impl PushRequest {
    /// Data-only update for an already registered widget.
    pub fn data(module_id: &str, data: WidgetData) -> Self {
        Self {
            module_id: module_id.to_string(),
            template: None,
            schema: None,
            data: Some(data),
        }
    }

    pub fn is_registration(&self) -> bool {
        self.template.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PushResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub props: Option<Value>,
}

impl PushResponse {
    /// Current widget settings; anything other than a JSON object reads as empty.
    pub fn into_props(self) -> PropMap {
        match self.props {
            Some(Value::Object(map)) => map,
            _ => PropMap::new(),
        }
    }
}
