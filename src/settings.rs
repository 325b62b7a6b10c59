use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

const ENDPOINT_ENV: &str = "VITALWATCH_ENDPOINT";
const DEBUG_ENV: &str = "VITALWATCH_DEBUG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RumSettings {
    pub enabled: bool,
    pub endpoint_base: String,
    pub flush_interval_secs: u64,
    pub memory_sample_interval_secs: u64,
    pub journey_capacity: usize,
    pub backlog_capacity: usize,
    pub scroll_debounce_ms: u64,
    pub default_step_wait_ms: u64,
    pub log_level: String,
}

impl Default for RumSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint_base: "http://localhost:3000".into(),
            flush_interval_secs: 30,
            memory_sample_interval_secs: 30,
            journey_capacity: 100,
            backlog_capacity: 10,
            scroll_debounce_ms: 100,
            default_step_wait_ms: 1000,
            log_level: "info".into(),
        }
    }
}

impl RumSettings {
    pub fn validate(&self) -> Result<()> {
        if self.flush_interval_secs == 0 {
            bail!("flushIntervalSecs must be greater than zero");
        }
        if self.memory_sample_interval_secs == 0 {
            bail!("memorySampleIntervalSecs must be greater than zero");
        }
        if self.journey_capacity == 0 {
            bail!("journeyCapacity must be greater than zero");
        }
        if self.backlog_capacity == 0 {
            bail!("backlogCapacity must be greater than zero");
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn memory_sample_interval(&self) -> Duration {
        Duration::from_secs(self.memory_sample_interval_secs)
    }

    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }

    pub fn default_step_wait(&self) -> Duration {
        Duration::from_millis(self.default_step_wait_ms)
    }

    /// Applies `VITALWATCH_ENDPOINT` and `VITALWATCH_DEBUG`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(DEBUG_ENV).ok(),
        )
    }

    fn with_overrides(mut self, endpoint: Option<String>, debug: Option<String>) -> Self {
        if let Some(endpoint) = endpoint.filter(|value| !value.trim().is_empty()) {
            self.endpoint_base = endpoint.trim().to_string();
        }
        let debug_mode = debug
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.log_level = "debug".into();
        }
        self
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<RumSettings>,
}

impl SettingsStore {
    /// Loads `path` when present. A file that fails to parse falls back to
    /// defaults; one that parses but holds invalid values is an error.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            RumSettings::default()
        };
        data.validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn rum(&self) -> RumSettings {
        self.read().clone()
    }

    pub fn update_rum(&self, settings: RumSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn persist(&self, data: &RumSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, RumSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RumSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
