mod loops;
mod transport;

pub use loops::{lifecycle_loop, memory_sampling_loop, periodic_flush_loop};
pub use transport::{HttpTransport, MemoryTransport, Transport, DATA_PATH, METRIC_PATH};

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

use crate::db::Database;
use crate::models::{MetricKind, MetricReport, MetricValue, SessionPayload};
use crate::monitor::LiveSession;
use crate::utils::now_millis;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub const BACKUP_KEY: &str = "rum-data";

/// Sends metric updates and session snapshots, and keeps the local backup.
///
/// Every network send is detached: callers never wait on the network and a
/// failed send is dropped after a debug log line.
#[derive(Clone)]
pub struct TelemetryReporter {
    live: LiveSession,
    transport: Arc<dyn Transport>,
    storage: Database,
    backlog: Arc<Mutex<VecDeque<SessionPayload>>>,
    backlog_capacity: usize,
    in_flight: TaskTracker,
}

impl TelemetryReporter {
    pub fn new(
        live: LiveSession,
        transport: Arc<dyn Transport>,
        storage: Database,
        backlog_capacity: usize,
    ) -> Self {
        Self {
            live,
            transport,
            storage,
            backlog: Arc::new(Mutex::new(VecDeque::with_capacity(backlog_capacity))),
            backlog_capacity: backlog_capacity.max(1),
            in_flight: TaskTracker::new(),
        }
    }

    /// Seeds the backlog from the persisted backup so the next flush extends
    /// it instead of overwriting it. An unreadable backup is discarded.
    pub async fn restore_backlog(&self) {
        let stored = match self.storage.get_item(BACKUP_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(err) => {
                log_warn!("reading {BACKUP_KEY} failed: {err:?}");
                return;
            }
        };

        match serde_json::from_str::<Vec<SessionPayload>>(&stored) {
            Ok(entries) => {
                let mut backlog = self.backlog.lock().await;
                backlog.extend(entries);
                while backlog.len() > self.backlog_capacity {
                    backlog.pop_front();
                }
                log_debug!("restored {} backed-up snapshots", backlog.len());
            }
            Err(err) => log_warn!("discarding unreadable {BACKUP_KEY} backup: {err}"),
        }
    }

    /// Immediate best-effort send of one metric update. No-op once retired.
    pub async fn report_metric(&self, metric: MetricKind, value: impl Into<MetricValue>) {
        let Some(session_id) = self.live.session_id().await else {
            return;
        };

        let report = MetricReport {
            session_id,
            metric,
            value: value.into(),
            timestamp: now_millis(),
        };
        self.dispatch(METRIC_PATH, &report);
    }

    /// Sends the current session, appends it to the backlog and persists the
    /// backlog. A final flush retires the session; flushing a retired session
    /// does nothing and returns `false`.
    pub async fn flush(&self, is_final: bool) -> bool {
        let Some(mut session) = self.live.take_for_flush(is_final).await else {
            return false;
        };
        session.timestamp = now_millis();
        let session_id = session.session_id.clone();
        let payload = SessionPayload { session, is_final };

        self.dispatch(DATA_PATH, &payload);

        let mut backlog = self.backlog.lock().await;
        backlog.push_back(payload);
        while backlog.len() > self.backlog_capacity {
            backlog.pop_front();
        }
        self.persist_backlog(&backlog).await;
        drop(backlog);

        if is_final {
            log_info!("session {session_id} flushed and retired");
        } else {
            log_debug!("session {session_id} flushed");
        }
        true
    }

    /// Snapshots sent so far, oldest first.
    pub async fn rum_data(&self) -> Vec<SessionPayload> {
        self.backlog.lock().await.iter().cloned().collect()
    }

    /// Waits for detached sends started so far. Sends are never awaited on
    /// the reporting path; this exists for shutdown and tests.
    pub async fn drain(&self) {
        self.in_flight.close();
        self.in_flight.wait().await;
        self.in_flight.reopen();
    }

    pub fn live(&self) -> &LiveSession {
        &self.live
    }

    fn dispatch<T: Serialize>(&self, path: &'static str, body: &T) {
        let body = match serde_json::to_value(body) {
            Ok(body) => body,
            Err(err) => {
                log_warn!("dropping {path} payload that failed to serialize: {err}");
                return;
            }
        };

        let transport = Arc::clone(&self.transport);
        self.in_flight.spawn(async move {
            if let Err(err) = transport.post(path, body).await {
                log_debug!("discarding failed send to {path}: {err:#}");
            }
        });
    }

    async fn persist_backlog(&self, backlog: &VecDeque<SessionPayload>) {
        let serialized = match serde_json::to_string(backlog) {
            Ok(serialized) => serialized,
            Err(err) => {
                log_warn!("skipping {BACKUP_KEY} backup, serialization failed: {err}");
                return;
            }
        };
        if let Err(err) = self.storage.set_item(BACKUP_KEY, serialized).await {
            log_warn!("skipping {BACKUP_KEY} backup, write failed: {err:?}");
        }
    }
}
