pub mod audit;
pub mod session;
pub mod vitals;

pub use audit::{
    AuditReport, AuditResult, DeviceProfile, MobileAuditConfig, NetworkCondition, ScreenSize,
    SkippedStep, TestScenario, TestStep,
};
pub use session::{
    DeviceInfo, MemoryUsage, MetricReport, MetricValue, NetworkInfo, PerformanceStats,
    SessionPayload, SessionRecord, UserJourneyStep,
};
pub use vitals::{CoreWebVitals, ExpectedMetrics, MetricKind};
