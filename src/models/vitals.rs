use serde::{Deserialize, Serialize};

/// Name under which a metric update is reported to `/api/rum/metric`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum MetricKind {
    Lcp,
    Fid,
    Cls,
    Ttfb,
    Fcp,
    Tbt,
    NetworkChange,
    MemoryUsage,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Lcp => "lcp",
            MetricKind::Fid => "fid",
            MetricKind::Cls => "cls",
            MetricKind::Ttfb => "ttfb",
            MetricKind::Fcp => "fcp",
            MetricKind::Tbt => "tbt",
            MetricKind::NetworkChange => "network-change",
            MetricKind::MemoryUsage => "memory-usage",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running Core Web Vitals for one page lifetime. Zero means "not yet observed".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoreWebVitals {
    pub lcp: f64,
    pub fid: f64,
    pub cls: f64,
    pub ttfb: f64,
    pub fcp: f64,
    /// Total Blocking Time.
    pub tbt: f64,
}

/// Thresholds a scenario must stay at or under. There is deliberately no TBT
/// threshold: TBT is collected but never scored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedMetrics {
    pub lcp: f64,
    pub fid: f64,
    pub cls: f64,
    pub ttfb: f64,
    pub fcp: f64,
}
