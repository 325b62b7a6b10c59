use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{self, Duration, Instant};
use uuid::Uuid;

use crate::models::{
    AuditReport, AuditResult, DeviceProfile, MobileAuditConfig, NetworkCondition, SkippedStep,
    TestScenario, TestStep,
};

use super::driver::{PageDriver, StepOutcome};
use super::scoring::{evaluate_metrics, generate_recommendations};

/// Where the runner is within one (scenario, network, device) combination.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum AuditPhase {
    #[default]
    Idle,
    Configuring,
    ExecutingSteps,
    Scoring,
    Recorded,
}

pub struct AuditRunner {
    driver: Arc<dyn PageDriver>,
    config: MobileAuditConfig,
    default_wait: Duration,
    phase_tx: watch::Sender<AuditPhase>,
}

impl AuditRunner {
    pub fn new(
        driver: Arc<dyn PageDriver>,
        config: MobileAuditConfig,
        default_wait: Duration,
    ) -> Self {
        let (phase_tx, _) = watch::channel(AuditPhase::Idle);
        Self {
            driver,
            config,
            default_wait,
            phase_tx,
        }
    }

    pub fn phase(&self) -> AuditPhase {
        *self.phase_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuditPhase> {
        self.phase_tx.subscribe()
    }

    fn set_phase(&self, phase: AuditPhase) {
        self.phase_tx.send_replace(phase);
    }

    /// Runs every scenario under every network condition and device profile,
    /// one combination at a time.
    pub async fn run_mobile_audit(&self) -> Result<AuditReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let combinations = self.config.test_scenarios.len()
            * self.config.network_conditions.len()
            * self.config.device_profiles.len();
        info!("Audit run {run_id} started with {combinations} combinations");

        let mut results = Vec::with_capacity(combinations);
        let outcome = async {
            for scenario in &self.config.test_scenarios {
                for network in &self.config.network_conditions {
                    for device in &self.config.device_profiles {
                        let result = self
                            .run_test_scenario(scenario, network, device)
                            .await
                            .with_context(|| {
                                format!(
                                    "audit of {:?} on {} / {} failed",
                                    scenario.name, network.name, device.name
                                )
                            })?;
                        results.push(result);
                    }
                }
            }
            Ok::<(), anyhow::Error>(())
        }
        .await;
        self.set_phase(AuditPhase::Idle);
        outcome?;

        let report = AuditReport {
            run_id,
            started_at,
            results,
        };
        info!(
            "Audit run {run_id} finished: {}/{} passed",
            report.passed_count(),
            report.results.len()
        );
        Ok(report)
    }

    async fn run_test_scenario(
        &self,
        scenario: &TestScenario,
        network: &NetworkCondition,
        device: &DeviceProfile,
    ) -> Result<AuditResult> {
        let started = Instant::now();

        self.set_phase(AuditPhase::Configuring);
        self.driver.apply_network_condition(network).await?;
        self.driver.apply_device_profile(device).await?;

        self.set_phase(AuditPhase::ExecutingSteps);
        let mut skipped_steps = Vec::new();
        for (index, step) in scenario.steps.iter().enumerate() {
            match self.execute_step(step).await? {
                StepOutcome::Performed => {
                    let wait = step
                        .wait_time()
                        .map(Duration::from_millis)
                        .unwrap_or(self.default_wait);
                    time::sleep(wait).await;
                }
                StepOutcome::TargetMissing => {
                    warn!(
                        "step skipped: target not found ({} step {index}: {})",
                        scenario.name,
                        step.describe()
                    );
                    skipped_steps.push(SkippedStep {
                        index,
                        step: step.describe(),
                    });
                }
            }
        }

        self.set_phase(AuditPhase::Scoring);
        let metrics = self.driver.collect_metrics().await?;
        let passed = evaluate_metrics(&metrics, &scenario.expected_metrics);
        let recommendations = generate_recommendations(&metrics, &scenario.expected_metrics);

        let result = AuditResult {
            scenario: scenario.name.clone(),
            network_condition: network.name.clone(),
            device_profile: device.name.clone(),
            metrics,
            total_time: started.elapsed().as_millis() as u64,
            passed,
            recommendations,
            skipped_steps,
        };
        self.set_phase(AuditPhase::Recorded);
        Ok(result)
    }

    async fn execute_step(&self, step: &TestStep) -> Result<StepOutcome> {
        match step {
            TestStep::Navigate { url, .. } => {
                self.driver.navigate(url).await?;
                Ok(StepOutcome::Performed)
            }
            TestStep::Click { selector, .. } => self.driver.click(selector).await,
            TestStep::Input { selector, text, .. } => self.driver.input(selector, text).await,
            TestStep::Scroll { percent, .. } => {
                self.driver.scroll_to(*percent).await?;
                Ok(StepOutcome::Performed)
            }
        }
    }
}
