//! Core Web Vitals observer.
//!
//! One independent subscription per entry type. A type the host cannot
//! deliver is skipped without affecting the others.

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::host::{EntryBatch, EntryType, PerformanceEntry, PerformanceHost, PerformanceSource};
use crate::models::{CoreWebVitals, MetricKind};
use crate::monitor::LiveSession;
use crate::reporter::TelemetryReporter;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Long tasks block the main thread for whatever exceeds this many ms.
pub const LONG_TASK_THRESHOLD_MS: f64 = 50.0;

pub const FIRST_CONTENTFUL_PAINT: &str = "first-contentful-paint";

/// Subscribes to every entry type the host offers and spawns one task per
/// available stream. Returns the spawned handles.
pub fn start_observers(
    performance: &mut dyn PerformanceHost,
    live: LiveSession,
    reporter: TelemetryReporter,
    cancel_token: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    for entry_type in EntryType::ALL {
        match performance.observe(entry_type) {
            PerformanceSource::Available(stream) => {
                handles.push(tokio::spawn(observe_stream(
                    entry_type,
                    stream,
                    live.clone(),
                    reporter.clone(),
                    cancel_token.clone(),
                )));
            }
            PerformanceSource::Unavailable => {
                log_info!("{} entries unsupported, skipping", entry_type.as_str());
            }
        }
    }

    handles
}

async fn observe_stream(
    entry_type: EntryType,
    mut stream: UnboundedReceiver<EntryBatch>,
    live: LiveSession,
    reporter: TelemetryReporter,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            batch = stream.recv() => {
                let Some(batch) = batch else { break };
                let Some(updates) = live
                    .update(|record| apply_batch(&mut record.metrics, entry_type, &batch))
                    .await
                else {
                    continue;
                };
                for (metric, value) in updates {
                    reporter.report_metric(metric, value).await;
                }
            }
            _ = cancel_token.cancelled() => break,
        }
    }

    log_debug!("{} observer stopped", entry_type.as_str());
}

/// Applies one observer callback's entries to `metrics` and returns the
/// metric updates to report, in order. Entries of another type are ignored.
pub fn apply_batch(
    metrics: &mut CoreWebVitals,
    entry_type: EntryType,
    batch: &[PerformanceEntry],
) -> Vec<(MetricKind, f64)> {
    let relevant = batch.iter().filter(|entry| entry.entry_type() == entry_type);

    // LCP candidates supersede each other; only the newest one in a callback counts.
    if entry_type == EntryType::LargestContentfulPaint {
        return relevant
            .last()
            .and_then(|entry| apply_entry(metrics, entry))
            .into_iter()
            .collect();
    }

    relevant
        .filter_map(|entry| apply_entry(metrics, entry))
        .collect()
}

/// Folds a single entry into `metrics`.
///
/// LCP, FID, TTFB and FCP are last-write-wins. CLS and TBT accumulate and so
/// never decrease. Derived values are clamped at zero.
pub fn apply_entry(
    metrics: &mut CoreWebVitals,
    entry: &PerformanceEntry,
) -> Option<(MetricKind, f64)> {
    match entry {
        PerformanceEntry::LargestContentfulPaint { start_time } => {
            metrics.lcp = start_time.max(0.0);
            Some((MetricKind::Lcp, metrics.lcp))
        }
        PerformanceEntry::FirstInput {
            start_time,
            processing_start,
        } => {
            let processing_start = (*processing_start)?;
            metrics.fid = (processing_start - start_time).max(0.0);
            Some((MetricKind::Fid, metrics.fid))
        }
        PerformanceEntry::LayoutShift {
            value,
            had_recent_input,
        } => {
            if *had_recent_input {
                return None;
            }
            metrics.cls += value.max(0.0);
            Some((MetricKind::Cls, metrics.cls))
        }
        PerformanceEntry::Navigation {
            request_start,
            response_start,
        } => {
            let (request_start, response_start) = ((*request_start)?, (*response_start)?);
            metrics.ttfb = (response_start - request_start).max(0.0);
            Some((MetricKind::Ttfb, metrics.ttfb))
        }
        PerformanceEntry::Paint { name, start_time } => {
            if name != FIRST_CONTENTFUL_PAINT {
                return None;
            }
            metrics.fcp = start_time.max(0.0);
            Some((MetricKind::Fcp, metrics.fcp))
        }
        PerformanceEntry::LongTask { duration } => {
            if *duration <= LONG_TASK_THRESHOLD_MS {
                return None;
            }
            metrics.tbt += duration - LONG_TASK_THRESHOLD_MS;
            Some((MetricKind::Tbt, metrics.tbt))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::device::StaticProbe;
    use crate::host::channel_page;
    use crate::reporter::{MemoryTransport, METRIC_PATH};
    use crate::testing::record;
    use std::sync::Arc;

    fn shift(value: f64, had_recent_input: bool) -> PerformanceEntry {
        PerformanceEntry::LayoutShift {
            value,
            had_recent_input,
        }
    }

    fn long_task(duration: f64) -> PerformanceEntry {
        PerformanceEntry::LongTask { duration }
    }

    #[test]
    fn cls_sums_shifts_without_recent_input_and_never_decreases() {
        let mut metrics = CoreWebVitals::default();
        let shifts = [
            shift(0.05, false),
            shift(0.5, true),
            shift(0.02, false),
            shift(0.0, false),
            shift(0.1, false),
        ];

        let mut previous = 0.0;
        for entry in &shifts {
            apply_entry(&mut metrics, entry);
            assert!(metrics.cls >= previous);
            previous = metrics.cls;
        }

        assert!((metrics.cls - 0.17).abs() < 1e-9);
    }

    #[test]
    fn tbt_counts_only_the_excess_over_fifty_ms() {
        let mut metrics = CoreWebVitals::default();
        let tasks = [long_task(30.0), long_task(50.0), long_task(80.0), long_task(250.0)];

        let updates = apply_batch(&mut metrics, EntryType::LongTask, &tasks);

        assert_eq!(metrics.tbt, 30.0 + 200.0);
        assert_eq!(updates, vec![(MetricKind::Tbt, 30.0), (MetricKind::Tbt, 230.0)]);
    }

    #[test]
    fn lcp_takes_the_last_entry_of_a_callback_even_if_smaller() {
        let mut metrics = CoreWebVitals::default();
        let batch = [
            PerformanceEntry::LargestContentfulPaint { start_time: 2400.0 },
            PerformanceEntry::LargestContentfulPaint { start_time: 1900.0 },
        ];

        let updates = apply_batch(&mut metrics, EntryType::LargestContentfulPaint, &batch);

        assert_eq!(metrics.lcp, 1900.0);
        assert_eq!(updates, vec![(MetricKind::Lcp, 1900.0)]);

        apply_batch(
            &mut metrics,
            EntryType::LargestContentfulPaint,
            &[PerformanceEntry::LargestContentfulPaint { start_time: 2600.0 }],
        );
        assert_eq!(metrics.lcp, 2600.0);
    }

    #[test]
    fn fid_ttfb_and_fcp_follow_their_entry_rules() {
        let mut metrics = CoreWebVitals::default();

        apply_entry(
            &mut metrics,
            &PerformanceEntry::FirstInput {
                start_time: 1000.0,
                processing_start: Some(1042.0),
            },
        );
        assert_eq!(metrics.fid, 42.0);

        let skipped = apply_entry(
            &mut metrics,
            &PerformanceEntry::FirstInput {
                start_time: 10.0,
                processing_start: None,
            },
        );
        assert!(skipped.is_none());
        assert_eq!(metrics.fid, 42.0);

        apply_entry(
            &mut metrics,
            &PerformanceEntry::Navigation {
                request_start: Some(100.0),
                response_start: Some(420.0),
            },
        );
        assert_eq!(metrics.ttfb, 320.0);

        assert!(apply_entry(
            &mut metrics,
            &PerformanceEntry::Paint {
                name: "first-paint".into(),
                start_time: 500.0
            }
        )
        .is_none());
        apply_entry(
            &mut metrics,
            &PerformanceEntry::Paint {
                name: FIRST_CONTENTFUL_PAINT.into(),
                start_time: 800.0,
            },
        );
        assert_eq!(metrics.fcp, 800.0);
    }

    #[tokio::test]
    async fn streams_update_the_session_and_report_each_change() {
        let transport = Arc::new(MemoryTransport::new());
        let live = LiveSession::new(record("session_obs"));
        let reporter = TelemetryReporter::new(
            live.clone(),
            transport.clone(),
            Database::open_in_memory().unwrap(),
            10,
        );

        // No long-task support on this host; the other streams still work.
        let supported = [
            EntryType::LargestContentfulPaint,
            EntryType::LayoutShift,
            EntryType::Paint,
        ];
        let (mut page, handle) = channel_page(Arc::new(StaticProbe::default()), "/", &supported);
        let handles = start_observers(
            page.performance.as_mut(),
            live.clone(),
            reporter.clone(),
            CancellationToken::new(),
        );
        assert_eq!(handles.len(), supported.len());

        handle.emit_entries(vec![
            PerformanceEntry::LargestContentfulPaint { start_time: 1500.0 },
            shift(0.05, false),
            long_task(400.0),
        ]);
        handle.emit_entries(vec![shift(0.05, false)]);
        drop(handle);
        for task in handles {
            task.await.unwrap();
        }
        reporter.drain().await;

        let metrics = live.snapshot().await.unwrap().metrics;
        assert_eq!(metrics.lcp, 1500.0);
        assert!((metrics.cls - 0.1).abs() < 1e-9);
        assert_eq!(metrics.tbt, 0.0);

        let reports = transport.sent_to(METRIC_PATH);
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|body| body["sessionId"] == "session_obs"));
    }
}
