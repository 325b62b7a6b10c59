use anyhow::Result;
use async_trait::async_trait;
use log::info;

use crate::models::{CoreWebVitals, DeviceProfile, NetworkCondition};

/// What happened to an element-targeting step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Performed,
    TargetMissing,
}

/// The page under audit. Real implementations sit on a browser automation
/// protocol; errors abort the whole run.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn apply_network_condition(&self, condition: &NetworkCondition) -> Result<()>;

    async fn apply_device_profile(&self, profile: &DeviceProfile) -> Result<()>;

    async fn navigate(&self, url: &str) -> Result<()>;

    async fn click(&self, selector: &str) -> Result<StepOutcome>;

    async fn input(&self, selector: &str, text: &str) -> Result<StepOutcome>;

    /// Scrolls to `percent` of the page height.
    async fn scroll_to(&self, percent: f64) -> Result<()>;

    async fn collect_metrics(&self) -> Result<CoreWebVitals>;
}

/// Driver without a browser behind it: logs every action, treats every
/// target as present and measures nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDriver;

#[async_trait]
impl PageDriver for LoggingDriver {
    async fn apply_network_condition(&self, condition: &NetworkCondition) -> Result<()> {
        info!(
            "Simulating network {} ({}/{} kbps, {} ms, {}% loss)",
            condition.name,
            condition.download_speed,
            condition.upload_speed,
            condition.latency,
            condition.packet_loss
        );
        Ok(())
    }

    async fn apply_device_profile(&self, profile: &DeviceProfile) -> Result<()> {
        info!(
            "Simulating device {} ({}x CPU slowdown, {} MB, {}x{})",
            profile.name,
            profile.cpu_slowdown,
            profile.memory_limit,
            profile.screen_size.width,
            profile.screen_size.height
        );
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        info!("navigate {url}");
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<StepOutcome> {
        info!("click {selector}");
        Ok(StepOutcome::Performed)
    }

    async fn input(&self, selector: &str, text: &str) -> Result<StepOutcome> {
        info!("input {selector} ({} chars)", text.chars().count());
        Ok(StepOutcome::Performed)
    }

    async fn scroll_to(&self, percent: f64) -> Result<()> {
        info!("scroll to {percent}%");
        Ok(())
    }

    async fn collect_metrics(&self) -> Result<CoreWebVitals> {
        Ok(CoreWebVitals::default())
    }
}
