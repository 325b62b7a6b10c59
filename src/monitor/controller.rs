use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    db::Database,
    device::{device_info, network_info, PlatformProbe},
    host::PageContext,
    identity::{new_session_id, IdentityStore},
    journey::{journey_loop, JourneyTracker},
    models::{
        CoreWebVitals, MetricKind, MetricValue, PerformanceStats, SessionPayload, SessionRecord,
    },
    observer::start_observers,
    reporter::{
        lifecycle_loop, memory_sampling_loop, periodic_flush_loop, TelemetryReporter, Transport,
    },
    settings::RumSettings,
    utils::now_millis,
};

use super::LiveSession;

/// Owns the RUM session of one page load and the tasks feeding it.
///
/// Event-stream tasks end on their own when the page's channels close; timer
/// tasks run until [`RumMonitor::stop`] or [`RumMonitor::finish`].
pub struct RumMonitor {
    live: LiveSession,
    reporter: TelemetryReporter,
    cancel_token: CancellationToken,
    stream_tasks: Vec<JoinHandle<()>>,
    timer_tasks: Vec<JoinHandle<()>>,
}

impl RumMonitor {
    pub async fn start(
        page: PageContext,
        settings: &RumSettings,
        storage: Database,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        settings.validate().context("refusing to start monitor")?;

        let PageContext {
            mut performance,
            probe,
            location,
            ui_events,
            lifecycle,
            network_changes,
        } = page;

        if !settings.enabled {
            info!("RUM disabled by settings; no session created");
            let live = LiveSession::retired();
            let reporter =
                TelemetryReporter::new(live.clone(), transport, storage, settings.backlog_capacity);
            return Ok(Self::idle(live, reporter));
        }

        let record = create_session(&IdentityStore::new(storage.clone()), probe.as_ref()).await;
        info!(
            "Starting RUM session {} for {} on {}",
            record.session_id, record.user_id, location
        );

        let live = LiveSession::new(record);
        let reporter = TelemetryReporter::new(
            live.clone(),
            transport,
            storage,
            settings.backlog_capacity,
        );
        reporter.restore_backlog().await;

        let cancel_token = CancellationToken::new();
        let mut stream_tasks = start_observers(
            performance.as_mut(),
            live.clone(),
            reporter.clone(),
            cancel_token.clone(),
        );

        if let Some(events) = ui_events {
            let tracker = JourneyTracker::new(live.clone(), settings.journey_capacity, location);
            stream_tasks.push(tokio::spawn(journey_loop(
                tracker,
                events,
                settings.scroll_debounce(),
                cancel_token.clone(),
            )));
        }

        if let Some(events) = lifecycle {
            stream_tasks.push(tokio::spawn(lifecycle_loop(
                reporter.clone(),
                events,
                cancel_token.clone(),
            )));
        }

        if let Some(changes) = network_changes {
            stream_tasks.push(tokio::spawn(network_change_loop(
                reporter.clone(),
                Arc::clone(&probe),
                changes,
                cancel_token.clone(),
            )));
        }

        let timer_tasks = vec![
            tokio::spawn(periodic_flush_loop(
                reporter.clone(),
                settings.flush_interval(),
                cancel_token.clone(),
            )),
            tokio::spawn(memory_sampling_loop(
                reporter.clone(),
                probe,
                settings.memory_sample_interval(),
                cancel_token.clone(),
            )),
        ];

        Ok(Self {
            live,
            reporter,
            cancel_token,
            stream_tasks,
            timer_tasks,
        })
    }

    fn idle(live: LiveSession, reporter: TelemetryReporter) -> Self {
        Self {
            live,
            reporter,
            cancel_token: CancellationToken::new(),
            stream_tasks: Vec::new(),
            timer_tasks: Vec::new(),
        }
    }

    pub fn reporter(&self) -> &TelemetryReporter {
        &self.reporter
    }

    pub async fn session(&self) -> Option<SessionRecord> {
        self.live.snapshot().await
    }

    /// Metrics, device, network and journey length of the live session.
    pub async fn performance_stats(&self) -> Option<PerformanceStats> {
        self.live
            .update(|record| PerformanceStats::from(&*record))
            .await
    }

    pub async fn rum_data(&self) -> Vec<SessionPayload> {
        self.reporter.rum_data().await
    }

    pub async fn flush(&self, is_final: bool) -> bool {
        self.reporter.flush(is_final).await
    }

    /// Tears everything down immediately, as when the page context is destroyed.
    pub async fn stop(mut self) -> Result<()> {
        self.cancel_token.cancel();
        let tasks: Vec<_> = self
            .stream_tasks
            .drain(..)
            .chain(self.timer_tasks.drain(..))
            .collect();
        join_all(tasks).await?;
        self.reporter.drain().await;
        Ok(())
    }

    /// Lets the event streams drain (the host must have closed them), stops
    /// the timers, sends the final snapshot and waits for outstanding sends.
    /// Returns whether this call retired the session.
    pub async fn finish(mut self) -> Result<bool> {
        join_all(std::mem::take(&mut self.stream_tasks)).await?;
        self.cancel_token.cancel();
        join_all(std::mem::take(&mut self.timer_tasks)).await?;

        let retired = self.reporter.flush(true).await;
        self.reporter.drain().await;
        Ok(retired)
    }
}

async fn join_all(tasks: impl IntoIterator<Item = JoinHandle<()>>) -> Result<()> {
    for task in tasks {
        task.await.context("monitor task failed to join")?;
    }
    Ok(())
}

async fn create_session(identity: &IdentityStore, probe: &dyn PlatformProbe) -> SessionRecord {
    SessionRecord {
        user_id: identity.get_or_create_user_id().await,
        session_id: new_session_id(),
        timestamp: now_millis(),
        metrics: CoreWebVitals::default(),
        device_info: device_info(probe),
        network_info: network_info(probe),
        user_journey: VecDeque::new(),
    }
}

/// Re-reads the connection on every change notification, stores it on the
/// session and reports it.
async fn network_change_loop(
    reporter: TelemetryReporter,
    probe: Arc<dyn PlatformProbe>,
    mut changes: UnboundedReceiver<()>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            change = changes.recv() => {
                if change.is_none() {
                    break;
                }
                let current = network_info(probe.as_ref());
                let stored = reporter
                    .live()
                    .update(|record| record.network_info = current.clone())
                    .await;
                if stored.is_some() {
                    reporter
                        .report_metric(MetricKind::NetworkChange, MetricValue::Network(current))
                        .await;
                }
            }
            _ = cancel_token.cancelled() => break,
        }
    }
}
