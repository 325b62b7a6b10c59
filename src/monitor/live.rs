use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::SessionRecord;

/// Shared handle to the one live session of a page. `None` once retired.
///
/// The observer, journey tracker and reporter each hold a clone; all writes go
/// through short critical sections so independent metric streams may
/// interleave freely.
#[derive(Clone, Default)]
pub struct LiveSession {
    inner: Arc<Mutex<Option<SessionRecord>>>,
}

impl LiveSession {
    pub fn new(record: SessionRecord) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(record))),
        }
    }

    /// A handle with no session, as after retirement.
    pub fn retired() -> Self {
        Self::default()
    }

    /// Runs `update` against the live record; `None` when already retired.
    pub async fn update<R>(&self, update: impl FnOnce(&mut SessionRecord) -> R) -> Option<R> {
        let mut guard = self.inner.lock().await;
        guard.as_mut().map(update)
    }

    pub async fn snapshot(&self) -> Option<SessionRecord> {
        self.inner.lock().await.clone()
    }

    pub async fn session_id(&self) -> Option<String> {
        self.inner
            .lock()
            .await
            .as_ref()
            .map(|record| record.session_id.clone())
    }

    pub async fn is_live(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Snapshot for a flush. With `retire` the record is taken out in the same
    /// critical section, so exactly one final flush can ever see it.
    pub async fn take_for_flush(&self, retire: bool) -> Option<SessionRecord> {
        let mut guard = self.inner.lock().await;
        if retire {
            guard.take()
        } else {
            guard.clone()
        }
    }
}
