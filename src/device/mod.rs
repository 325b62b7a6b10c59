mod probe;

pub use probe::{ConnectionInfo, DeviceFacts, PlatformProbe, StaticProbe, SystemProbe};

use crate::models::{DeviceInfo, NetworkInfo};

/// Snapshot the device. Anything the platform can't tell us becomes zero/empty.
pub fn device_info(probe: &dyn PlatformProbe) -> DeviceInfo {
    let facts = probe.device_facts();
    let (width, height) = facts.screen_size.unwrap_or((0, 0));

    DeviceInfo {
        user_agent: facts.user_agent.unwrap_or_default(),
        screen_resolution: format!("{width}x{height}"),
        device_pixel_ratio: facts.device_pixel_ratio.unwrap_or(0.0),
        memory: facts.device_memory_gb.unwrap_or(0.0),
        cores: facts.hardware_concurrency.unwrap_or(0),
        platform: facts.platform.unwrap_or_default(),
    }
}

/// Current connection characteristics, `{"unknown", 0, 0, false}` when the
/// host has no network information.
pub fn network_info(probe: &dyn PlatformProbe) -> NetworkInfo {
    let Some(connection) = probe.connection() else {
        return NetworkInfo::default();
    };
    let defaults = NetworkInfo::default();

    NetworkInfo {
        effective_type: connection
            .effective_type
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.effective_type),
        downlink: connection.downlink.unwrap_or(defaults.downlink),
        rtt: connection.rtt.unwrap_or(defaults.rtt),
        save_data: connection.save_data.unwrap_or(defaults.save_data),
    }
}

/// Rounds total memory down to the buckets the Device Memory API exposes.
pub fn approximate_memory_gb(total_bytes: u64) -> f64 {
    const BUCKETS: [f64; 6] = [8.0, 4.0, 2.0, 1.0, 0.5, 0.25];
    let gb = total_bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    BUCKETS
        .iter()
        .copied()
        .find(|bucket| gb >= *bucket)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_platform_yields_zeroed_snapshots() {
        let probe = StaticProbe::default();

        let device = device_info(&probe);
        assert_eq!(device.screen_resolution, "0x0");
        assert_eq!(device.cores, 0);
        assert_eq!(device.memory, 0.0);
        assert!(device.user_agent.is_empty());

        assert_eq!(network_info(&probe), NetworkInfo::default());
    }

    #[test]
    fn partial_connection_fills_gaps_with_defaults() {
        let probe = StaticProbe::default().with_connection(ConnectionInfo {
            effective_type: Some("4g".into()),
            downlink: Some(10.0),
            rtt: None,
            save_data: None,
        });

        let network = network_info(&probe);
        assert_eq!(network.effective_type, "4g");
        assert_eq!(network.downlink, 10.0);
        assert_eq!(network.rtt, 0.0);
        assert!(!network.save_data);
    }

    #[test]
    fn device_facts_map_onto_device_info() {
        let probe = StaticProbe::new(DeviceFacts {
            user_agent: Some("Mozilla/5.0 (iPhone)".into()),
            screen_size: Some((390, 844)),
            device_pixel_ratio: Some(3.0),
            device_memory_gb: Some(4.0),
            hardware_concurrency: Some(6),
            platform: Some("iPhone".into()),
        });

        let device = device_info(&probe);
        assert_eq!(device.screen_resolution, "390x844");
        assert_eq!(device.device_pixel_ratio, 3.0);
        assert_eq!(device.cores, 6);
        assert_eq!(device.platform, "iPhone");
    }

    #[test]
    fn memory_rounds_down_to_api_buckets() {
        const GB: u64 = 1024 * 1024 * 1024;
        assert_eq!(approximate_memory_gb(0), 0.0);
        assert_eq!(approximate_memory_gb(GB / 8), 0.0);
        assert_eq!(approximate_memory_gb(GB / 3), 0.25);
        assert_eq!(approximate_memory_gb(3 * GB), 2.0);
        assert_eq!(approximate_memory_gb(64 * GB), 8.0);
    }

    #[test]
    fn system_platform_never_panics() {
        let probe = SystemProbe::new();
        let device = device_info(&probe);
        assert!(device.user_agent.starts_with("vitalwatch/"));
        assert_eq!(network_info(&probe).effective_type, "unknown");

        probe.set_connection(Some(ConnectionInfo {
            effective_type: Some("wifi".into()),
            ..ConnectionInfo::default()
        }));
        assert_eq!(network_info(&probe).effective_type, "wifi");
    }
}
