//! Best-effort pid -> process name lookup, one implementation per platform.

#[cfg(target_os = "linux")]
use std::fs;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::error::NameResolutionError;

/// pid -> name. Callers fall back to the pid when this fails
/// (see `metrics::Collector::process_name`).
pub trait ProcessNames {
    fn lookup(&mut self, pid: u32) -> Result<String, NameResolutionError>;
}

/// Linux: `/proc/{pid}/comm`.
#[cfg(target_os = "linux")]
#[derive(Debug, Default)]
pub struct ProcComm;

#[cfg(target_os = "linux")]
impl ProcessNames for ProcComm {
    fn lookup(&mut self, pid: u32) -> Result<String, NameResolutionError> {
        fs::read_to_string(format!("/proc/{pid}/comm"))
            .map(|s| s.trim().to_string())
            .map_err(|e| NameResolutionError {
                pid,
                reason: e.to_string(),
            })
    }
}

/// Any platform: sysinfo process table, refreshed for the requested pid only.
pub struct SysinfoNames {
    sys: System,
}

impl SysinfoNames {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for SysinfoNames {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessNames for SysinfoNames {
    fn lookup(&mut self, pid: u32) -> Result<String, NameResolutionError> {
        let pid_ = Pid::from_u32(pid);
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid_]),
            true,
            ProcessRefreshKind::nothing(),
        );
        self.sys
            .process(pid_)
            .map(|p| p.name().to_string_lossy().into_owned())
            .ok_or_else(|| NameResolutionError {
                pid,
                reason: "not in process table".into(),
            })
    }
}

/// Resolver for the current platform.
pub fn platform_resolver() -> Box<dyn ProcessNames> {
    #[cfg(target_os = "linux")]
    {
        Box::new(ProcComm)
    }
    #[cfg(not(target_os = "linux"))]
    {
        Box::new(SysinfoNames::new())
    }
}

impl<T: ProcessNames + ?Sized> ProcessNames for Box<T> {
    fn lookup(&mut self, pid: u32) -> Result<String, NameResolutionError> {
        (**self).lookup(pid)
    }
}
