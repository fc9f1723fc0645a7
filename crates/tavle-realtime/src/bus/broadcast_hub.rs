//! Managed channel transport: one shared broadcast channel per room.
//!
//! Channels are cached by room id and reference-counted by subscriber
//! count; the sender also receives its own events (echo-to-self), so a
//! single component can emit and render its own strokes through one
//! code path. Dropping the last subscription tears the channel down and
//! evicts the cache entry.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use tavle_core::events::live::LiveEvent;
use tavle_core::traits::bus::{EventBus, Subscription};
use tavle_core::types::room::RoomId;

#[derive(Debug)]
struct RoomChannel {
    tx: broadcast::Sender<LiveEvent>,
    /// Live subscription handles on this channel.
    handles: usize,
}

/// Managed-channel event bus backed by per-room broadcast channels.
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    rooms: Arc<DashMap<String, RoomChannel>>,
    buffer_size: usize,
}

impl BroadcastHub {
    /// Create a new broadcast hub.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            buffer_size,
        }
    }

    /// Decrement a room's handle count, evicting the channel when the
    /// last handle is gone.
    fn release(rooms: &DashMap<String, RoomChannel>, room: &str) {
        if let Some(mut entry) = rooms.get_mut(room) {
            entry.handles = entry.handles.saturating_sub(1);
            if entry.handles == 0 {
                drop(entry);
                rooms.remove(room);
                debug!(room = %room, "Evicted empty room channel");
            }
        }
    }
}

#[async_trait]
impl EventBus for BroadcastHub {
    async fn publish(&self, room: &RoomId, event: LiveEvent) -> usize {
        match self.rooms.get(room.as_str()) {
            // send() only errors when there are no receivers; an empty
            // room is a no-op, not a failure.
            Some(entry) => entry.tx.send(event).unwrap_or(0),
            None => 0,
        }
    }

    async fn subscribe(&self, room: &RoomId) -> Subscription {
        let mut rx = {
            let mut entry = self
                .rooms
                .entry(room.as_str().to_string())
                .or_insert_with(|| RoomChannel {
                    tx: broadcast::channel(self.buffer_size).0,
                    handles: 0,
                });
            entry.handles += 1;
            entry.tx.subscribe()
        };

        // Adapt the broadcast receiver onto the common subscription
        // shape. The forwarder exits when the channel is torn down or
        // the subscription side hangs up.
        let (out_tx, out_rx) = mpsc::channel(self.buffer_size);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Ok(event) => {
                            if out_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "Broadcast subscriber lagged, events dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = out_tx.closed() => break,
                }
            }
        });

        let rooms = Arc::clone(&self.rooms);
        let room_key = room.as_str().to_string();
        Subscription::new(room.clone(), out_rx, move || {
            Self::release(&rooms, &room_key);
        })
    }

    fn subscriber_count(&self, room: &RoomId) -> usize {
        self.rooms
            .get(room.as_str())
            .map(|e| e.handles)
            .unwrap_or(0)
    }

    fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
