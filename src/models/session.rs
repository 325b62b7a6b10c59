use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::vitals::{CoreWebVitals, MetricKind};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub user_agent: String,
    /// `"{width}x{height}"`, `"0x0"` when unknown.
    pub screen_resolution: String,
    pub device_pixel_ratio: f64,
    /// Approximate memory in GB.
    pub memory: f64,
    pub cores: u32,
    pub platform: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub effective_type: String,
    /// Mbps.
    pub downlink: f64,
    /// Milliseconds.
    pub rtt: f64,
    pub save_data: bool,
}

impl Default for NetworkInfo {
    fn default() -> Self {
        Self {
            effective_type: "unknown".into(),
            downlink: 0.0,
            rtt: 0.0,
            save_data: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserJourneyStep {
    pub timestamp: i64,
    pub action: String,
    pub page: String,
    /// Milliseconds since the previous step, 0 for the first one.
    pub duration: i64,
}

/// The live record for one page lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: String,
    pub session_id: String,
    pub timestamp: i64,
    pub metrics: CoreWebVitals,
    pub device_info: DeviceInfo,
    pub network_info: NetworkInfo,
    pub user_journey: VecDeque<UserJourneyStep>,
}

/// Body of `POST /api/rum/data` and one entry of the `rum-data` backup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    /// Carries the send time in `timestamp`, not the session start.
    #[serde(flatten)]
    pub session: SessionRecord,
    pub is_final: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub used: u64,
    pub total: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Network(NetworkInfo),
    Memory(MemoryUsage),
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Number(value)
    }
}

/// Body of `POST /api/rum/metric`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricReport {
    pub session_id: String,
    pub metric: MetricKind,
    pub value: MetricValue,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceStats {
    pub metrics: CoreWebVitals,
    pub device_info: DeviceInfo,
    pub network_info: NetworkInfo,
    pub user_journey_length: usize,
}

impl From<&SessionRecord> for PerformanceStats {
    fn from(record: &SessionRecord) -> Self {
        Self {
            metrics: record.metrics,
            device_info: record.device_info.clone(),
            network_info: record.network_info.clone(),
            user_journey_length: record.user_journey.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> SessionRecord {
        SessionRecord {
            user_id: "user_abc".into(),
            session_id: "session_1_xyz".into(),
            timestamp: 1_700_000_000_000,
            metrics: CoreWebVitals::default(),
            device_info: DeviceInfo::default(),
            network_info: NetworkInfo::default(),
            user_journey: VecDeque::new(),
        }
    }

    #[test]
    fn payload_flattens_session_fields_next_to_is_final() {
        let payload = SessionPayload {
            session: sample_record(),
            is_final: true,
        };
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["sessionId"], "session_1_xyz");
        assert_eq!(json["isFinal"], true);
        assert_eq!(json["networkInfo"]["effectiveType"], "unknown");
        assert!(json["userJourney"].as_array().unwrap().is_empty());
        assert!(json.get("session").is_none());
    }

    #[test]
    fn metric_report_uses_wire_names() {
        let report = MetricReport {
            session_id: "s".into(),
            metric: MetricKind::MemoryUsage,
            value: MetricValue::Memory(MemoryUsage {
                used: 1,
                total: 2,
                limit: 3,
            }),
            timestamp: 5,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["metric"], "memory-usage");
        assert_eq!(json["value"]["limit"], 3);

        let numeric = serde_json::to_value(MetricValue::from(2.5)).unwrap();
        assert_eq!(numeric, serde_json::json!(2.5));
    }
}
