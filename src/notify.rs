use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast hub: one channel per listing, carrying committed events so
/// availability displays can refresh without polling.
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<Event>>,
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

    /// Subscribe to a listing's committed events. Creates the channel if
    /// nobody has subscribed yet.
    pub fn subscribe(&self, listing_id: Ulid) -> broadcast::Receiver<Event> {
        self.channels
            .entry(listing_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish a committed event. No-op without subscribers.
    pub fn send(&self, listing_id: Ulid, event: &Event) {
        if let Some(sender) = self.channels.get(&listing_id) {
            let _ = sender.send(event.clone());
        }
    }

    /// Drop a listing's channel once the listing is removed.
    pub fn remove(&self, listing_id: &Ulid) {
        self.channels.remove(listing_id);
    }
}
