//! Agent configuration: CLI flags > environment > JSON config file > defaults.
//! Config file lives under $XDG_CONFIG_HOME/hudpush/config.json (fallback ~/.config/hudpush/config.json)

use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_URL: &str = "http://localhost:9090/api/widget";
pub const DEFAULT_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_PREFIX: &str = "gpu";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub url: Url,
    pub interval: Duration,
    pub timeout: Duration,
    /// Leading segment of every widget id.
    pub prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub url: Option<String>,
    pub interval_ms: Option<String>,
    pub timeout_ms: Option<String>,
    pub prefix: Option<String>,
    pub config: Option<PathBuf>,
    pub help: bool,
}

pub fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [--url URL|-u URL] [--interval-ms N|-i N] [--timeout-ms N] [--prefix P] [--config PATH|-c PATH]\n\
         Environment: HUDPUSH_URL, HUDPUSH_INTERVAL_MS, HUDPUSH_TIMEOUT_MS, HUDPUSH_PREFIX"
    )
}

pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, ConfigError> {
    let mut it = args.into_iter();
    let _ = it.next(); // program name
    let mut out = ParsedArgs::default();

    fn value<I: Iterator<Item = String>>(it: &mut I, flag: &str) -> Result<String, ConfigError> {
        it.next()
            .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
    }

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => out.help = true,
            "--url" | "-u" => out.url = Some(value(&mut it, &arg)?),
            "--interval-ms" | "-i" => out.interval_ms = Some(value(&mut it, &arg)?),
            "--timeout-ms" => out.timeout_ms = Some(value(&mut it, &arg)?),
            "--prefix" => out.prefix = Some(value(&mut it, &arg)?),
            "--config" | "-c" => out.config = Some(PathBuf::from(value(&mut it, &arg)?)),
            _ => {
                let Some((flag, v)) = arg.split_once('=') else {
                    return Err(ConfigError::UnexpectedArgument(arg.clone()));
                };
                let v = v.to_string();
                match flag {
                    "--url" => out.url = Some(v),
                    "--interval-ms" => out.interval_ms = Some(v),
                    "--timeout-ms" => out.timeout_ms = Some(v),
                    "--prefix" => out.prefix = Some(v),
                    "--config" => out.config = Some(PathBuf::from(v)),
                    _ => return Err(ConfigError::UnexpectedArgument(arg.clone())),
                }
            }
        }
    }
    Ok(out)
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("hudpush")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hudpush")
    }
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Read a config file. A missing file reads as empty; an unparsable one is an error.
pub fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(s) => serde_json::from_str(&s).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(source) => Err(ConfigError::Read {
            path: path.display().to_string(),
            source,
        }),
    }
}

fn parse_ms(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        key: "url",
        value: raw.to_string(),
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid()),
    }
}

impl AgentConfig {
    /// Merge all layers. `env` looks up an environment variable by name.
    pub fn resolve<F>(args: &ParsedArgs, file: &FileConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = args
            .url
            .clone()
            .or_else(|| env("HUDPUSH_URL"))
            .or_else(|| file.url.clone())
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        let interval_ms = match args
            .interval_ms
            .clone()
            .or_else(|| env("HUDPUSH_INTERVAL_MS"))
        {
            Some(raw) => parse_ms("interval_ms", &raw)?,
            None => match file.interval_ms {
                Some(0) => {
                    return Err(ConfigError::InvalidValue {
                        key: "interval_ms",
                        value: "0".into(),
                    })
                }
                Some(v) => v,
                None => DEFAULT_INTERVAL_MS,
            },
        };

        let timeout_ms = match args.timeout_ms.clone().or_else(|| env("HUDPUSH_TIMEOUT_MS")) {
            Some(raw) => parse_ms("timeout_ms", &raw)?,
            None => match file.timeout_ms {
                Some(0) => {
                    return Err(ConfigError::InvalidValue {
                        key: "timeout_ms",
                        value: "0".into(),
                    })
                }
                Some(v) => v,
                None => DEFAULT_TIMEOUT_MS,
            },
        };

        let prefix = args
            .prefix
            .clone()
            .or_else(|| env("HUDPUSH_PREFIX"))
            .or_else(|| file.prefix.clone())
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        if prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "prefix",
                value: prefix,
            });
        }

        Ok(Self {
            url: parse_url(&url)?,
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
            prefix,
        })
    }

    /// Resolve against the process environment and the config file named by
    /// `--config` (or the default location).
    pub fn load(args: &ParsedArgs) -> Result<Self, ConfigError> {
        let path = args.config.clone().unwrap_or_else(config_path);
        let file = load_file(&path)?;
        Self::resolve(args, &file, |k| std::env::var(k).ok())
    }
}
