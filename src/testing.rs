use std::collections::VecDeque;

use crate::models::{CoreWebVitals, DeviceInfo, NetworkInfo, SessionRecord};

pub(crate) fn record(session_id: &str) -> SessionRecord {
    SessionRecord {
        user_id: "user_test".into(),
        session_id: session_id.into(),
        timestamp: 0,
        metrics: CoreWebVitals::default(),
        device_info: DeviceInfo::default(),
        network_info: NetworkInfo::default(),
        user_journey: VecDeque::new(),
    }
}
