use std::collections::VecDeque;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{self, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::host::UiEvent;
use crate::models::UserJourneyStep;
use crate::monitor::LiveSession;
use crate::utils::now_millis;

const ENABLE_LOGS: bool = false;

use crate::log_debug;

pub const ACTION_CLICK: &str = "click";
pub const ACTION_INPUT: &str = "input";
pub const ACTION_SCROLL: &str = "scroll";
pub const ACTION_NAVIGATION: &str = "navigation";

/// Sole writer of the session's journey.
pub struct JourneyTracker {
    live: LiveSession,
    capacity: usize,
    current_page: String,
}

impl JourneyTracker {
    pub fn new(live: LiveSession, capacity: usize, location: impl Into<String>) -> Self {
        Self {
            live,
            capacity: capacity.max(1),
            current_page: location.into(),
        }
    }

    /// Appends a step for `action`; `page` defaults to the current location.
    /// Returns `false` when the session is already retired.
    pub async fn record_step(&self, action: &str, page: Option<&str>) -> bool {
        self.record_step_at(action, page, now_millis()).await
    }

    async fn record_step_at(&self, action: &str, page: Option<&str>, timestamp: i64) -> bool {
        let page = page.unwrap_or(&self.current_page).to_string();
        let capacity = self.capacity;
        let action = action.to_string();

        self.live
            .update(move |record| push_step(&mut record.user_journey, action, page, timestamp, capacity))
            .await
            .is_some()
    }

    async fn handle(&mut self, event: UiEvent) {
        match event {
            UiEvent::Click { page } => {
                self.record_step(ACTION_CLICK, page.as_deref()).await;
            }
            UiEvent::Input { page } => {
                self.record_step(ACTION_INPUT, page.as_deref()).await;
            }
            UiEvent::Navigation { path } => {
                self.current_page = path;
                self.record_step(ACTION_NAVIGATION, None).await;
            }
            // Debounced by the caller.
            UiEvent::Scroll => {
                self.record_step(ACTION_SCROLL, None).await;
            }
        }
    }
}

/// Appends a step timed against its predecessor, then evicts the oldest
/// entries until at most `capacity` remain.
pub fn push_step(
    journey: &mut VecDeque<UserJourneyStep>,
    action: String,
    page: String,
    timestamp: i64,
    capacity: usize,
) {
    let duration = journey
        .back()
        .map(|last| (timestamp - last.timestamp).max(0))
        .unwrap_or(0);

    journey.push_back(UserJourneyStep {
        timestamp,
        action,
        page,
        duration,
    });

    while journey.len() > capacity {
        journey.pop_front();
    }
}

/// Feeds UI events into the tracker. Scrolls are recorded once the page has
/// been quiet for `scroll_debounce`.
pub async fn journey_loop(
    mut tracker: JourneyTracker,
    mut events: UnboundedReceiver<UiEvent>,
    scroll_debounce: Duration,
    cancel_token: CancellationToken,
) {
    let mut scroll_deadline: Option<Instant> = None;

    loop {
        let deadline = scroll_deadline;
        tokio::select! {
            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                scroll_deadline = None;
                tracker.handle(UiEvent::Scroll).await;
            }
            event = events.recv() => match event {
                Some(UiEvent::Scroll) => {
                    scroll_deadline = Some(Instant::now() + scroll_debounce);
                }
                Some(event) => {
                    log_debug!("journey event {event:?}");
                    tracker.handle(event).await;
                }
                None => {
                    // The pending debounce timer would still have fired.
                    if scroll_deadline.is_some() {
                        tracker.handle(UiEvent::Scroll).await;
                    }
                    break;
                }
            },
            _ = cancel_token.cancelled() => break,
        }
    }
}
