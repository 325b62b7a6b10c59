use serde::{Deserialize, Serialize};

/// The six Performance Observer entry types the vitals observer subscribes to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntryType {
    #[serde(rename = "largest-contentful-paint")]
    LargestContentfulPaint,
    #[serde(rename = "first-input")]
    FirstInput,
    #[serde(rename = "layout-shift")]
    LayoutShift,
    #[serde(rename = "navigation")]
    Navigation,
    #[serde(rename = "paint")]
    Paint,
    #[serde(rename = "longtask")]
    LongTask,
}

impl EntryType {
    pub const ALL: [EntryType; 6] = [
        EntryType::LargestContentfulPaint,
        EntryType::FirstInput,
        EntryType::LayoutShift,
        EntryType::Navigation,
        EntryType::Paint,
        EntryType::LongTask,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::LargestContentfulPaint => "largest-contentful-paint",
            EntryType::FirstInput => "first-input",
            EntryType::LayoutShift => "layout-shift",
            EntryType::Navigation => "navigation",
            EntryType::Paint => "paint",
            EntryType::LongTask => "longtask",
        }
    }
}

/// A performance timeline entry, reduced to the fields the observer reads.
/// Optional fields mirror attributes older engines may not expose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "entryType")]
pub enum PerformanceEntry {
    #[serde(rename = "largest-contentful-paint", rename_all = "camelCase")]
    LargestContentfulPaint { start_time: f64 },
    #[serde(rename = "first-input", rename_all = "camelCase")]
    FirstInput {
        start_time: f64,
        #[serde(default)]
        processing_start: Option<f64>,
    },
    #[serde(rename = "layout-shift", rename_all = "camelCase")]
    LayoutShift {
        value: f64,
        #[serde(default)]
        had_recent_input: bool,
    },
    #[serde(rename = "navigation", rename_all = "camelCase")]
    Navigation {
        #[serde(default)]
        request_start: Option<f64>,
        #[serde(default)]
        response_start: Option<f64>,
    },
    #[serde(rename = "paint", rename_all = "camelCase")]
    Paint { name: String, start_time: f64 },
    #[serde(rename = "longtask", rename_all = "camelCase")]
    LongTask { duration: f64 },
}

impl PerformanceEntry {
    pub fn entry_type(&self) -> EntryType {
        match self {
            PerformanceEntry::LargestContentfulPaint { .. } => EntryType::LargestContentfulPaint,
            PerformanceEntry::FirstInput { .. } => EntryType::FirstInput,
            PerformanceEntry::LayoutShift { .. } => EntryType::LayoutShift,
            PerformanceEntry::Navigation { .. } => EntryType::Navigation,
            PerformanceEntry::Paint { .. } => EntryType::Paint,
            PerformanceEntry::LongTask { .. } => EntryType::LongTask,
        }
    }
}
