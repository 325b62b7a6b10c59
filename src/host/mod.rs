//! The browser capability surface the monitor consumes.
//!
//! Every capability is optional. A host that cannot deliver an entry type
//! answers [`PerformanceSource::Unavailable`] for it, and a page without UI,
//! lifecycle or connection events simply leaves those receivers empty.

mod channel;
mod entries;

pub use channel::{channel_page, ChannelPerformance, HostHandle};
pub use entries::{EntryType, PerformanceEntry};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::device::{ConnectionInfo, PlatformProbe};

/// One batch per observer callback, in delivery order.
pub type EntryBatch = Vec<PerformanceEntry>;

pub enum PerformanceSource {
    Available(UnboundedReceiver<EntryBatch>),
    Unavailable,
}

/// Feature-detecting subscription point for performance entries.
pub trait PerformanceHost: Send {
    fn observe(&mut self, entry_type: EntryType) -> PerformanceSource;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UiEvent {
    /// `page` defaults to the current location.
    Click {
        #[serde(default)]
        page: Option<String>,
    },
    Input {
        #[serde(default)]
        page: Option<String>,
    },
    Scroll,
    /// History pop to `path`.
    Navigation { path: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleEvent {
    PageHide,
    BeforeUnload,
}

/// Everything a monitor session needs from one page load.
pub struct PageContext {
    pub performance: Box<dyn PerformanceHost>,
    pub probe: Arc<dyn PlatformProbe>,
    /// Path of the page at load time.
    pub location: String,
    pub ui_events: Option<UnboundedReceiver<UiEvent>>,
    pub lifecycle: Option<UnboundedReceiver<LifecycleEvent>>,
    pub network_changes: Option<UnboundedReceiver<()>>,
}

/// JSON-lines wire form accepted by the `monitor` command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HostMessage {
    Entry { entry: PerformanceEntry },
    Entries { entries: Vec<PerformanceEntry> },
    Ui { event: UiEvent },
    Lifecycle { event: LifecycleEvent },
    NetworkChange { connection: ConnectionInfo },
}
