use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::device::PlatformProbe;

use super::{
    EntryBatch, EntryType, LifecycleEvent, PageContext, PerformanceEntry, PerformanceHost,
    PerformanceSource, UiEvent,
};

/// In-process performance host fed through a [`HostHandle`]. Only the entry
/// types it was built with are observable; each can be observed once.
pub struct ChannelPerformance {
    receivers: HashMap<EntryType, UnboundedReceiver<EntryBatch>>,
}

impl PerformanceHost for ChannelPerformance {
    fn observe(&mut self, entry_type: EntryType) -> PerformanceSource {
        match self.receivers.remove(&entry_type) {
            Some(receiver) => PerformanceSource::Available(receiver),
            None => PerformanceSource::Unavailable,
        }
    }
}

/// Sender side of a channel-backed page. Dropping it ends every stream.
#[derive(Clone)]
pub struct HostHandle {
    entries: HashMap<EntryType, UnboundedSender<EntryBatch>>,
    ui: UnboundedSender<UiEvent>,
    lifecycle: UnboundedSender<LifecycleEvent>,
    network: UnboundedSender<()>,
}

impl HostHandle {
    /// Delivers entries as one observer callback per entry type, preserving
    /// order within each type. Entries of unsupported types are dropped.
    /// Returns how many entries were delivered.
    pub fn emit_entries(&self, entries: Vec<PerformanceEntry>) -> usize {
        let mut batches: Vec<(EntryType, EntryBatch)> = Vec::new();
        for entry in entries {
            let entry_type = entry.entry_type();
            match batches.iter_mut().find(|(kind, _)| *kind == entry_type) {
                Some((_, batch)) => batch.push(entry),
                None => batches.push((entry_type, vec![entry])),
            }
        }

        let mut delivered = 0;
        for (entry_type, batch) in batches {
            let Some(sender) = self.entries.get(&entry_type) else {
                continue;
            };
            let count = batch.len();
            if sender.send(batch).is_ok() {
                delivered += count;
            }
        }
        delivered
    }

    pub fn emit_ui(&self, event: UiEvent) -> bool {
        self.ui.send(event).is_ok()
    }

    pub fn emit_lifecycle(&self, event: LifecycleEvent) -> bool {
        self.lifecycle.send(event).is_ok()
    }

    /// Signals that the probe's connection information changed.
    pub fn notify_network_change(&self) -> bool {
        self.network.send(()).is_ok()
    }

    pub fn supports(&self, entry_type: EntryType) -> bool {
        self.entries.contains_key(&entry_type)
    }
}

/// Builds a page whose capabilities are driven through the returned handle.
pub fn channel_page(
    probe: Arc<dyn PlatformProbe>,
    location: impl Into<String>,
    supported: &[EntryType],
) -> (PageContext, HostHandle) {
    let mut senders = HashMap::new();
    let mut receivers = HashMap::new();
    for entry_type in supported {
        let (tx, rx) = mpsc::unbounded_channel();
        senders.insert(*entry_type, tx);
        receivers.insert(*entry_type, rx);
    }

    let (ui_tx, ui_rx) = mpsc::unbounded_channel();
    let (lifecycle_tx, lifecycle_rx) = mpsc::unbounded_channel();
    let (network_tx, network_rx) = mpsc::unbounded_channel();

    let page = PageContext {
        performance: Box::new(ChannelPerformance { receivers }),
        probe,
        location: location.into(),
        ui_events: Some(ui_rx),
        lifecycle: Some(lifecycle_rx),
        network_changes: Some(network_rx),
    };

    let handle = HostHandle {
        entries: senders,
        ui: ui_tx,
        lifecycle: lifecycle_tx,
        network: network_tx,
    };

    (page, handle)
}
