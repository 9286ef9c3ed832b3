//! Error taxonomy. Only `SourceError` and `ConfigError` are fatal; everything
//! else is recovered where it occurs and logged.

use thiserror::Error;

/// Telemetry subsystem could not be brought up. Aborts startup.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("telemetry source failed to initialize: {0}")]
    Init(String),
    #[error("no telemetry sources found")]
    NoSourceFound,
}

/// A single reading failed. The collector folds this into an absent field.
#[derive(Debug, Error)]
#[error("{metric} unavailable: {reason}")]
pub struct MetricReadError {
    pub metric: &'static str,
    pub reason: String,
}

impl MetricReadError {
    pub fn new(metric: &'static str, reason: impl ToString) -> Self {
        Self {
            metric,
            reason: reason.to_string(),
        }
    }
}

/// A mandatory reading failed; the device is skipped for this cycle.
#[derive(Debug, Error)]
#[error("sample aborted for device {device}: {source}")]
pub struct SampleAbortError {
    pub device: u32,
    #[source]
    pub source: MetricReadError,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timed out")]
    Timeout,
    #[error("service answered {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
#[error("cannot resolve name for pid {pid}: {reason}")]
pub struct NameResolutionError {
    pub pid: u32,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("missing value for {0}")]
    MissingValue(String),
    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
