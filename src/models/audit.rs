use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::vitals::{CoreWebVitals, ExpectedMetrics};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkCondition {
    pub name: String,
    /// Kbps.
    pub download_speed: u32,
    /// Kbps.
    pub upload_speed: u32,
    /// Milliseconds.
    pub latency: u32,
    /// Percentage.
    pub packet_loss: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub name: String,
    pub cpu_slowdown: u32,
    /// MB.
    pub memory_limit: u32,
    pub screen_size: ScreenSize,
    pub user_agent: String,
}

/// One scripted UI action. `wait_time` (ms) overrides the default settle time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum TestStep {
    #[serde(rename_all = "camelCase")]
    Navigate {
        url: String,
        #[serde(default)]
        wait_time: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Click {
        selector: String,
        #[serde(default)]
        wait_time: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Input {
        selector: String,
        text: String,
        #[serde(default)]
        wait_time: Option<u64>,
    },
    /// Scroll to `percent` of the page height.
    #[serde(rename_all = "camelCase")]
    Scroll {
        percent: f64,
        #[serde(default)]
        wait_time: Option<u64>,
    },
}

impl TestStep {
    pub fn wait_time(&self) -> Option<u64> {
        match self {
            TestStep::Navigate { wait_time, .. }
            | TestStep::Click { wait_time, .. }
            | TestStep::Input { wait_time, .. }
            | TestStep::Scroll { wait_time, .. } => *wait_time,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            TestStep::Navigate { url, .. } => format!("navigate {url}"),
            TestStep::Click { selector, .. } => format!("click {selector}"),
            TestStep::Input { selector, .. } => format!("input {selector}"),
            TestStep::Scroll { percent, .. } => format!("scroll {percent}%"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestScenario {
    pub name: String,
    pub description: String,
    pub steps: Vec<TestStep>,
    pub expected_metrics: ExpectedMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MobileAuditConfig {
    pub network_conditions: Vec<NetworkCondition>,
    pub device_profiles: Vec<DeviceProfile>,
    pub test_scenarios: Vec<TestScenario>,
}

/// A step that did nothing because its target element was not on the page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkippedStep {
    pub index: usize,
    pub step: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub scenario: String,
    pub network_condition: String,
    pub device_profile: String,
    pub metrics: CoreWebVitals,
    /// Milliseconds.
    pub total_time: u64,
    pub passed: bool,
    pub recommendations: Vec<String>,
    pub skipped_steps: Vec<SkippedStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub results: Vec<AuditResult>,
}

impl AuditReport {
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|result| result.passed).count()
    }
}
