use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub for ledger events, one channel per resource name.
pub struct NotifyHub {
    channels: DashMap<String, broadcast::Sender<Event>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to events for a resource. Creates the channel if needed.
    pub fn subscribe(&self, resource: &str) -> broadcast::Receiver<Event> {
        let sender = self
            .channels
            .entry(resource.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send an event. No-op if nobody is listening.
    pub fn send(&self, resource: &str, event: &Event) {
        if let Some(sender) = self.channels.get(resource) {
            let _ = sender.send(event.clone());
        }
    }

    /// Drop a channel; live receivers see the stream close.
    pub fn remove(&self, resource: &str) {
        self.channels.remove(resource);
    }
}
