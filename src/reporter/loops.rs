use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::device::PlatformProbe;
use crate::host::LifecycleEvent;
use crate::models::{MetricKind, MetricValue};

use super::TelemetryReporter;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Flushes the live session every `period` until cancelled or retired.
pub async fn periodic_flush_loop(
    reporter: TelemetryReporter,
    period: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !reporter.flush(false).await {
                    log_debug!("periodic flush stopping, session retired");
                    break;
                }
            }
            _ = cancel_token.cancelled() => {
                log_debug!("periodic flush loop shutting down");
                break;
            }
        }
    }
}

/// Page-hide and before-unload both request a final flush; whichever lands
/// second finds the session retired and does nothing.
pub async fn lifecycle_loop(
    reporter: TelemetryReporter,
    mut events: UnboundedReceiver<LifecycleEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let retired = reporter.flush(true).await;
                log_info!("lifecycle {event:?}: final flush {}", if retired { "sent" } else { "skipped" });
            }
            _ = cancel_token.cancelled() => break,
        }
    }
}

/// Reports process memory every `period`. Hosts that cannot measure memory
/// get no loop at all.
pub async fn memory_sampling_loop(
    reporter: TelemetryReporter,
    probe: Arc<dyn PlatformProbe>,
    period: Duration,
    cancel_token: CancellationToken,
) {
    if probe.memory_usage().is_none() {
        log_debug!("memory usage unavailable on this host, not sampling");
        return;
    }

    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !reporter.live().is_live().await {
                    break;
                }
                if let Some(usage) = probe.memory_usage() {
                    reporter
                        .report_metric(MetricKind::MemoryUsage, MetricValue::Memory(usage))
                        .await;
                }
            }
            _ = cancel_token.cancelled() => break,
        }
    }
}
