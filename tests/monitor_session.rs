use std::sync::Arc;
use std::time::Duration;

use vitalwatch_lib::db::Database;
use vitalwatch_lib::device::{ConnectionInfo, DeviceFacts, StaticProbe};
use vitalwatch_lib::host::{channel_page, EntryType, LifecycleEvent, PerformanceEntry, UiEvent};
use vitalwatch_lib::identity::USER_ID_KEY;
use vitalwatch_lib::monitor::RumMonitor;
use vitalwatch_lib::reporter::{MemoryTransport, DATA_PATH, METRIC_PATH};
use vitalwatch_lib::settings::RumSettings;

fn quiet_settings() -> RumSettings {
    RumSettings {
        flush_interval_secs: 3600,
        memory_sample_interval_secs: 3600,
        ..RumSettings::default()
    }
}

fn phone_platform() -> Arc<StaticProbe> {
    Arc::new(
        StaticProbe::new(DeviceFacts {
            user_agent: Some("Mozilla/5.0 (Linux; Android 10)".into()),
            screen_size: Some((414, 896)),
            device_pixel_ratio: Some(2.0),
            device_memory_gb: Some(4.0),
            hardware_concurrency: Some(8),
            platform: Some("Linux armv8l".into()),
        })
        .with_connection(ConnectionInfo {
            effective_type: Some("4g".into()),
            downlink: Some(10.0),
            rtt: Some(50.0),
            save_data: Some(false),
        }),
    )
}

#[tokio::test]
async fn full_session_is_reported_once_at_the_end() {
    let transport = Arc::new(MemoryTransport::new());
    let storage = Database::open_in_memory().unwrap();
    let (page, handle) = channel_page(phone_platform(), "/", &EntryType::ALL);

    let monitor = RumMonitor::start(page, &quiet_settings(), storage.clone(), transport.clone())
        .await
        .unwrap();
    let session_id = monitor.session().await.unwrap().session_id;
    assert!(session_id.starts_with("session_"));

    handle.emit_entries(vec![
        PerformanceEntry::Navigation {
            request_start: Some(100.0),
            response_start: Some(350.0),
        },
        PerformanceEntry::Paint {
            name: "first-contentful-paint".into(),
            start_time: 800.0,
        },
        PerformanceEntry::LargestContentfulPaint { start_time: 1200.0 },
        PerformanceEntry::LayoutShift {
            value: 0.1,
            had_recent_input: false,
        },
        PerformanceEntry::LongTask { duration: 120.0 },
    ]);
    handle.emit_ui(UiEvent::Click { page: None });
    handle.emit_ui(UiEvent::Navigation {
        path: "/settings".into(),
    });
    handle.emit_ui(UiEvent::Input { page: None });
    drop(handle);

    assert!(monitor.finish().await.unwrap());

    let metric_reports = transport.sent_to(METRIC_PATH);
    assert_eq!(metric_reports.len(), 5);
    assert!(metric_reports
        .iter()
        .all(|body| body["sessionId"] == session_id.as_str()));

    let data = transport.sent_to(DATA_PATH);
    assert_eq!(data.len(), 1);
    let payload = &data[0];
    assert_eq!(payload["isFinal"], true);
    assert_eq!(payload["metrics"]["lcp"], 1200.0);
    assert_eq!(payload["metrics"]["fcp"], 800.0);
    assert_eq!(payload["metrics"]["ttfb"], 250.0);
    assert_eq!(payload["metrics"]["tbt"], 70.0);
    assert_eq!(payload["metrics"]["fid"], 0.0);
    assert_eq!(payload["deviceInfo"]["screenResolution"], "414x896");
    assert_eq!(payload["networkInfo"]["effectiveType"], "4g");

    let pages: Vec<&str> = payload["userJourney"]
        .as_array()
        .unwrap()
        .iter()
        .map(|step| step["page"].as_str().unwrap())
        .collect();
    assert_eq!(pages, vec!["/", "/settings", "/settings"]);

    let stored_user = storage.get_item(USER_ID_KEY).await.unwrap();
    assert_eq!(stored_user.as_deref(), payload["userId"].as_str());
}

#[tokio::test]
async fn page_hide_and_unload_retire_the_session_once() {
    let transport = Arc::new(MemoryTransport::new());
    let (page, handle) = channel_page(phone_platform(), "/", &[]);
    let monitor = RumMonitor::start(
        page,
        &quiet_settings(),
        Database::open_in_memory().unwrap(),
        transport.clone(),
    )
    .await
    .unwrap();

    handle.emit_lifecycle(LifecycleEvent::PageHide);
    handle.emit_lifecycle(LifecycleEvent::BeforeUnload);
    drop(handle);

    // The lifecycle events already retired the session.
    assert!(!monitor.finish().await.unwrap());
    assert_eq!(transport.sent_to(DATA_PATH).len(), 1);
}

#[tokio::test]
async fn network_changes_update_the_session_and_are_reported() {
    let transport = Arc::new(MemoryTransport::new());
    let probe = phone_platform();
    let (page, handle) = channel_page(probe.clone(), "/", &[]);
    let monitor = RumMonitor::start(
        page,
        &quiet_settings(),
        Database::open_in_memory().unwrap(),
        transport.clone(),
    )
    .await
    .unwrap();

    probe.set_connection(Some(ConnectionInfo {
        effective_type: Some("3g".into()),
        rtt: Some(400.0),
        ..ConnectionInfo::default()
    }));
    handle.notify_network_change();
    drop(handle);
    monitor.finish().await.unwrap();

    let reports = transport.sent_to(METRIC_PATH);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["metric"], "network-change");
    assert_eq!(reports[0]["value"]["effectiveType"], "3g");
    assert_eq!(reports[0]["value"]["downlink"], 0.0);

    let data = transport.sent_to(DATA_PATH);
    assert_eq!(data[0]["networkInfo"]["rtt"], 400.0);
}

#[tokio::test]
async fn disabled_monitor_creates_no_session() {
    let transport = Arc::new(MemoryTransport::new());
    let (page, handle) = channel_page(phone_platform(), "/", &EntryType::ALL);
    let settings = RumSettings {
        enabled: false,
        ..RumSettings::default()
    };
    let monitor = RumMonitor::start(
        page,
        &settings,
        Database::open_in_memory().unwrap(),
        transport.clone(),
    )
    .await
    .unwrap();

    assert!(monitor.performance_stats().await.is_none());
    handle.emit_entries(vec![PerformanceEntry::LongTask { duration: 500.0 }]);
    drop(handle);

    assert!(!monitor.finish().await.unwrap());
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn identity_and_backup_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("vitalwatch.sqlite3");

    let mut user_ids = Vec::new();
    let mut backlog_sizes = Vec::new();
    for _ in 0..2 {
        let transport = Arc::new(MemoryTransport::new());
        let (page, handle) = channel_page(phone_platform(), "/", &[]);
        let monitor = RumMonitor::start(
            page,
            &quiet_settings(),
            Database::new(db_path.clone()).unwrap(),
            transport.clone(),
        )
        .await
        .unwrap();
        user_ids.push(monitor.session().await.unwrap().user_id);
        let reporter = monitor.reporter().clone();

        drop(handle);
        monitor.finish().await.unwrap();
        backlog_sizes.push(reporter.rum_data().await.len());
    }

    assert_eq!(user_ids[0], user_ids[1]);
    assert_eq!(backlog_sizes, vec![1, 2]);
}

#[tokio::test]
async fn invalid_settings_are_rejected() {
    let (page, _handle) = channel_page(phone_platform(), "/", &[]);
    let settings = RumSettings {
        journey_capacity: 0,
        ..RumSettings::default()
    };

    let result = RumMonitor::start(
        page,
        &settings,
        Database::open_in_memory().unwrap(),
        Arc::new(MemoryTransport::new()),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn performance_stats_track_the_live_session() {
    let transport = Arc::new(MemoryTransport::new());
    let (page, handle) = channel_page(phone_platform(), "/", &EntryType::ALL);
    let monitor = RumMonitor::start(
        page,
        &quiet_settings(),
        Database::open_in_memory().unwrap(),
        transport.clone(),
    )
    .await
    .unwrap();

    let stats = monitor.performance_stats().await.unwrap();
    assert_eq!(stats.user_journey_length, 0);
    assert_eq!(stats.device_info.cores, 8);
    assert_eq!(stats.network_info.effective_type, "4g");

    handle.emit_entries(vec![PerformanceEntry::LargestContentfulPaint { start_time: 900.0 }]);
    handle.emit_ui(UiEvent::Click { page: None });
    handle.emit_ui(UiEvent::Input { page: None });

    let stats = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let stats = monitor.performance_stats().await.unwrap();
            if stats.user_journey_length == 2 && stats.metrics.lcp == 900.0 {
                break stats;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("live stats never caught up with the page");
    assert_eq!(stats.metrics.cls, 0.0);

    drop(handle);
    let reporter = monitor.reporter().clone();
    monitor.finish().await.unwrap();
    assert!(!reporter.live().is_live().await);
    assert_eq!(transport.sent_to(DATA_PATH)[0]["userJourney"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn stop_tears_down_without_a_final_flush() {
    let transport = Arc::new(MemoryTransport::new());
    let (page, handle) = channel_page(phone_platform(), "/", &EntryType::ALL);
    let monitor = RumMonitor::start(
        page,
        &quiet_settings(),
        Database::open_in_memory().unwrap(),
        transport.clone(),
    )
    .await
    .unwrap();
    let reporter = monitor.reporter().clone();

    // The page still holds its handle; stop must not wait for the streams to close.
    tokio::time::timeout(Duration::from_secs(5), monitor.stop())
        .await
        .expect("stop waited on open streams")
        .unwrap();

    assert!(!handle.emit_ui(UiEvent::Click { page: None }));
    assert!(transport.sent_to(DATA_PATH).is_empty());
    assert!(reporter.live().is_live().await);
}
