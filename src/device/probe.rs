use std::sync::{Mutex, RwLock};

use sysinfo::{CpuRefreshKind, MemoryRefreshKind, Pid, ProcessesToUpdate, RefreshKind, System};

use crate::models::MemoryUsage;

use super::approximate_memory_gb;

/// Raw device values as the host reports them; `None` means unsupported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceFacts {
    pub user_agent: Option<String>,
    pub screen_size: Option<(u32, u32)>,
    pub device_pixel_ratio: Option<f64>,
    pub device_memory_gb: Option<f64>,
    pub hardware_concurrency: Option<u32>,
    pub platform: Option<String>,
}

/// Network Information API values; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionInfo {
    pub effective_type: Option<String>,
    pub downlink: Option<f64>,
    pub rtt: Option<f64>,
    pub save_data: Option<bool>,
}

/// Platform introspection. Implementations must not panic on unsupported hosts.
pub trait PlatformProbe: Send + Sync {
    fn device_facts(&self) -> DeviceFacts;

    fn connection(&self) -> Option<ConnectionInfo>;

    /// Heap/process memory, when the host can measure it.
    fn memory_usage(&self) -> Option<MemoryUsage> {
        None
    }
}

/// Probe backed by `sysinfo` for the machine the monitor runs on.
/// A headless host has no screen; connection details only exist once the
/// embedder pushes them.
pub struct SystemProbe {
    system: Mutex<System>,
    pid: Pid,
    connection: RwLock<Option<ConnectionInfo>>,
}

impl SystemProbe {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::new())
                .with_memory(MemoryRefreshKind::new().with_ram()),
        );

        Self {
            system: Mutex::new(system),
            pid: Pid::from_u32(std::process::id()),
            connection: RwLock::new(None),
        }
    }

    pub fn set_connection(&self, connection: Option<ConnectionInfo>) {
        replace_connection(&self.connection, connection);
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformProbe for SystemProbe {
    fn device_facts(&self) -> DeviceFacts {
        let system = self.system.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let os = System::long_os_version().unwrap_or_else(|| std::env::consts::OS.to_string());
        let cores = system.cpus().len() as u32;

        DeviceFacts {
            user_agent: Some(format!("vitalwatch/{} ({os})", env!("CARGO_PKG_VERSION"))),
            screen_size: None,
            device_pixel_ratio: None,
            device_memory_gb: Some(approximate_memory_gb(system.total_memory())),
            hardware_concurrency: (cores > 0).then_some(cores),
            platform: System::name().map(|name| format!("{name} {}", std::env::consts::ARCH)),
        }
    }

    fn connection(&self) -> Option<ConnectionInfo> {
        read_connection(&self.connection)
    }

    fn memory_usage(&self) -> Option<MemoryUsage> {
        let mut system = self.system.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let pid = self.pid;
        system.refresh_memory();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        let total = system.total_memory();
        system.process(pid).map(|process| MemoryUsage {
            used: process.memory(),
            total,
            limit: total,
        })
    }
}

/// Probe with explicit values. The connection can be replaced at runtime so
/// an embedder can report network changes.
#[derive(Default)]
pub struct StaticProbe {
    facts: DeviceFacts,
    connection: RwLock<Option<ConnectionInfo>>,
    memory: Option<MemoryUsage>,
}

impl StaticProbe {
    pub fn new(facts: DeviceFacts) -> Self {
        Self {
            facts,
            ..Self::default()
        }
    }

    pub fn with_connection(self, connection: ConnectionInfo) -> Self {
        self.set_connection(Some(connection));
        self
    }

    pub fn with_memory(mut self, memory: MemoryUsage) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn set_connection(&self, connection: Option<ConnectionInfo>) {
        replace_connection(&self.connection, connection);
    }
}

impl PlatformProbe for StaticProbe {
    fn device_facts(&self) -> DeviceFacts {
        self.facts.clone()
    }

    fn connection(&self) -> Option<ConnectionInfo> {
        read_connection(&self.connection)
    }

    fn memory_usage(&self) -> Option<MemoryUsage> {
        self.memory
    }
}

fn read_connection(slot: &RwLock<Option<ConnectionInfo>>) -> Option<ConnectionInfo> {
    slot.read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

fn replace_connection(slot: &RwLock<Option<ConnectionInfo>>, connection: Option<ConnectionInfo>) {
    *slot.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = connection;
}
