//! Server-push transport: a process-wide registry of open streams.
//!
//! `publish` hands the event to every open subscriber stream for the
//! room, pruning streams whose write fails; stream teardown removes the
//! subscriber, and an empty room is pruned so the registry never grows
//! unboundedly. Publishes iterate a snapshot of the subscriber set, so
//! a concurrent unsubscribe never leaves a dangling reference.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use tavle_core::events::live::LiveEvent;
use tavle_core::traits::bus::{EventBus, Subscription};
use tavle_core::types::room::RoomId;

/// One subscriber's outbound sender plus its registry key.
#[derive(Debug, Clone)]
struct StreamEntry {
    id: u64,
    sender: mpsc::Sender<LiveEvent>,
}

#[derive(Debug)]
struct Inner {
    /// Room id string → open subscriber streams.
    rooms: DashMap<String, Vec<StreamEntry>>,
    /// Monotonic subscriber id source.
    next_id: AtomicU64,
    /// Per-subscriber buffer size.
    buffer_size: usize,
}

impl Inner {
    /// Remove one subscriber from a room, evicting the room when empty.
    fn remove_subscriber(&self, room: &str, id: u64) {
        if let Some(mut entry) = self.rooms.get_mut(room) {
            entry.retain(|s| s.id != id);
            if entry.is_empty() {
                drop(entry);
                self.rooms.remove(room);
                debug!(room = %room, "Pruned empty room from stream registry");
            }
        }
    }
}

/// Server-push event bus backed by per-subscriber mpsc streams.
#[derive(Debug, Clone)]
pub struct StreamHub {
    inner: Arc<Inner>,
}

impl StreamHub {
    /// Create a new stream hub.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                rooms: DashMap::new(),
                next_id: AtomicU64::new(1),
                buffer_size,
            }),
        }
    }
}

#[async_trait]
impl EventBus for StreamHub {
    async fn publish(&self, room: &RoomId, event: LiveEvent) -> usize {
        // Snapshot the subscriber set before writing; the live set may
        // shrink concurrently.
        let snapshot: Vec<StreamEntry> = match self.inner.rooms.get(room.as_str()) {
            Some(entry) => entry.clone(),
            None => return 0,
        };

        let mut delivered = 0usize;
        let mut dead: Vec<u64> = Vec::new();

        for sub in &snapshot {
            match sub.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(room = %room, subscriber = sub.id, "Stream buffer full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(sub.id);
                }
            }
        }

        for id in dead {
            self.inner.remove_subscriber(room.as_str(), id);
        }

        delivered
    }

    async fn subscribe(&self, room: &RoomId) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.buffer_size);

        self.inner
            .rooms
            .entry(room.as_str().to_string())
            .or_default()
            .push(StreamEntry { id, sender: tx });

        debug!(room = %room, subscriber = id, "Stream subscriber registered");

        let inner = Arc::clone(&self.inner);
        let room_key = room.as_str().to_string();
        Subscription::new(room.clone(), rx, move || {
            inner.remove_subscriber(&room_key, id);
        })
    }

    fn subscriber_count(&self, room: &RoomId) -> usize {
        self.inner
            .rooms
            .get(room.as_str())
            .map(|e| e.len())
            .unwrap_or(0)
    }

    fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }
}
