//! Built-in audit matrix: four networks, four devices, two scenarios.

use anyhow::{bail, Result};

use crate::models::{
    DeviceProfile, ExpectedMetrics, MobileAuditConfig, NetworkCondition, ScreenSize, TestScenario,
    TestStep,
};

pub fn default_audit_config() -> MobileAuditConfig {
    MobileAuditConfig {
        network_conditions: default_network_conditions(),
        device_profiles: default_device_profiles(),
        test_scenarios: default_test_scenarios(),
    }
}

/// Narrows `config` to the scenario called `name`.
pub fn select_scenario(mut config: MobileAuditConfig, name: &str) -> Result<MobileAuditConfig> {
    config
        .test_scenarios
        .retain(|scenario| scenario.name.eq_ignore_ascii_case(name));

    if config.test_scenarios.is_empty() {
        bail!("no audit scenario named {name:?}");
    }
    Ok(config)
}

fn network(name: &str, download: u32, upload: u32, latency: u32, loss: f64) -> NetworkCondition {
    NetworkCondition {
        name: name.to_string(),
        download_speed: download,
        upload_speed: upload,
        latency,
        packet_loss: loss,
    }
}

fn default_network_conditions() -> Vec<NetworkCondition> {
    vec![
        network("3G Slow", 500, 100, 400, 0.1),
        network("3G Fast", 1500, 750, 300, 0.05),
        network("4G", 4000, 3000, 150, 0.01),
        network("WiFi", 10_000, 10_000, 50, 0.0),
    ]
}

fn device(
    name: &str,
    cpu_slowdown: u32,
    memory_limit: u32,
    (width, height): (u32, u32),
    user_agent: &str,
) -> DeviceProfile {
    DeviceProfile {
        name: name.to_string(),
        cpu_slowdown,
        memory_limit,
        screen_size: ScreenSize { width, height },
        user_agent: user_agent.to_string(),
    }
}

fn default_device_profiles() -> Vec<DeviceProfile> {
    vec![
        device(
            "Low-end Android",
            4,
            512,
            (360, 640),
            "Mozilla/5.0 (Linux; Android 8.0; SM-G570F) AppleWebKit/537.36",
        ),
        device(
            "Mid-range Android",
            2,
            1024,
            (414, 896),
            "Mozilla/5.0 (Linux; Android 10; SM-A505F) AppleWebKit/537.36",
        ),
        device(
            "iPhone SE",
            2,
            2048,
            (375, 667),
            "Mozilla/5.0 (iPhone; CPU iPhone OS 14_0 like Mac OS X) AppleWebKit/605.1.15",
        ),
        device(
            "iPhone 12",
            1,
            4096,
            (390, 844),
            "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) AppleWebKit/605.1.15",
        ),
    ]
}

fn default_test_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario {
            name: "Home Page Load".into(),
            description: "Load the home page".into(),
            steps: vec![
                TestStep::Navigate {
                    url: "/".into(),
                    wait_time: Some(5000),
                },
                TestStep::Scroll {
                    percent: 50.0,
                    wait_time: Some(2000),
                },
                TestStep::Click {
                    selector: ".btn-primary".into(),
                    wait_time: Some(1000),
                },
            ],
            expected_metrics: ExpectedMetrics {
                lcp: 2500.0,
                fid: 100.0,
                cls: 0.1,
                ttfb: 800.0,
                fcp: 1800.0,
            },
        },
        TestScenario {
            name: "Bug Fixer Page".into(),
            description: "Use the bug fixer tool".into(),
            steps: vec![
                TestStep::Navigate {
                    url: "/bug-fixer".into(),
                    wait_time: Some(3000),
                },
                TestStep::Input {
                    selector: ".code-editor".into(),
                    text: "const user = null;\nuser.name;".into(),
                    wait_time: Some(1000),
                },
                TestStep::Click {
                    selector: ".fix-button".into(),
                    wait_time: Some(5000),
                },
            ],
            expected_metrics: ExpectedMetrics {
                lcp: 2000.0,
                fid: 100.0,
                cls: 0.05,
                ttfb: 600.0,
                fcp: 1500.0,
            },
        },
    ]
}
