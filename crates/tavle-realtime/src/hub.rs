//! Top-level realtime facade tying transport and presence together.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::info;

use tavle_core::config::RealtimeConfig;
use tavle_core::events::live::LiveEvent;
use tavle_core::traits::bus::{EventBus, Subscription};
use tavle_core::types::room::RoomId;

use crate::bus::broadcast_hub::BroadcastHub;
use crate::bus::stream_hub::StreamHub;
use crate::presence::monitor::PresenceMonitor;

/// Transport strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Server-push stream registry (SSE write side).
    Stream,
    /// Managed per-room broadcast channels.
    Broadcast,
}

/// Central realtime hub: the selected bus transport, the presence
/// monitor, and a shutdown signal.
#[derive(Clone)]
pub struct LiveHub {
    /// The event bus transport.
    bus: Arc<dyn EventBus>,
    /// Teacher-view presence state.
    presence: Arc<PresenceMonitor>,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for LiveHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveHub").finish()
    }
}

impl LiveHub {
    /// Create a hub with the given transport strategy.
    pub fn new(config: &RealtimeConfig, transport: Transport) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let bus: Arc<dyn EventBus> = match transport {
            Transport::Stream => Arc::new(StreamHub::new(config.channel_buffer_size)),
            Transport::Broadcast => Arc::new(BroadcastHub::new(config.channel_buffer_size)),
        };

        info!(transport = ?transport, "Realtime hub initialized");

        Self {
            bus,
            presence: Arc::new(PresenceMonitor::new(config.presence_timeout_seconds)),
            shutdown_tx,
        }
    }

    /// Publish an event to a room, feeding presence beacons into the
    /// monitor on the way through. Fire-and-forget: failures never
    /// propagate to the caller.
    pub async fn publish(&self, room: &RoomId, event: LiveEvent) -> usize {
        if let LiveEvent::Presence { state, timestamp } = &event {
            self.presence.record(room, *state, *timestamp);
        }
        self.bus.publish(room, event).await
    }

    /// Subscribe to a room's live events.
    pub async fn subscribe(&self, room: &RoomId) -> Subscription {
        self.bus.subscribe(room).await
    }

    /// Publish a kick to a room and drop it from the presence monitor.
    /// Best-effort: a missed delivery is covered by the heartbeat path.
    pub async fn kick(&self, room: &RoomId, reason: &str) -> usize {
        let delivered = self
            .bus
            .publish(
                room,
                LiveEvent::Kick {
                    reason: reason.to_string(),
                    timestamp: Utc::now(),
                },
            )
            .await;
        self.presence.forget(room);
        delivered
    }

    /// The underlying bus, for callers that only need the trait.
    pub fn bus(&self) -> Arc<dyn EventBus> {
        Arc::clone(&self.bus)
    }

    /// The presence monitor.
    pub fn presence(&self) -> &Arc<PresenceMonitor> {
        &self.presence
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal shutdown to everything holding a receiver.
    pub fn shutdown(&self) {
        info!("Shutting down realtime hub");
        let _ = self.shutdown_tx.send(());
    }
}
