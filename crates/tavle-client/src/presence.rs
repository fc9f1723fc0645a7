//! Client presence beacon.
//!
//! Emits `open` on a fixed interval while visible, the new state on
//! every visibility change, and `closed` on teardown. The teacher side
//! additionally times out silent rooms, so an ungraceful termination
//! (crash, network loss) is still detected without the final beacon.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tavle_core::events::live::{LiveEvent, PresenceState};
use tavle_core::traits::bus::EventBus;
use tavle_core::types::room::RoomId;

/// Periodic presence emitter for one joined room.
pub struct PresenceBeacon {
    bus: Arc<dyn EventBus>,
    room: RoomId,
    state_tx: watch::Sender<PresenceState>,
    token: CancellationToken,
}

impl std::fmt::Debug for PresenceBeacon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceBeacon")
            .field("room", &self.room)
            .finish()
    }
}

impl PresenceBeacon {
    /// Start beaconing `open` immediately and then on every interval
    /// while the state is `open`.
    pub async fn start(
        bus: Arc<dyn EventBus>,
        room: RoomId,
        interval: std::time::Duration,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(PresenceState::Open);
        let token = CancellationToken::new();

        Self::emit(&bus, &room, PresenceState::Open).await;

        {
            let bus = Arc::clone(&bus);
            let room = room.clone();
            let token = token.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval_at(
                    tokio::time::Instant::now() + interval,
                    interval,
                );
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = ticker.tick() => {
                            // Interval beacons only while visible; hidden
                            // and closed states are event-driven.
                            if *state_rx.borrow() == PresenceState::Open {
                                Self::emit(&bus, &room, PresenceState::Open).await;
                            }
                        }
                    }
                }
            });
        }

        Self {
            bus,
            room,
            state_tx,
            token,
        }
    }

    /// Report a visibility change, beaconing the new state immediately.
    pub async fn set_state(&self, state: PresenceState) {
        let _ = self.state_tx.send(state);
        Self::emit(&self.bus, &self.room, state).await;
    }

    /// Teardown: beacon `closed` once and stop the interval task.
    pub async fn close(self) {
        Self::emit(&self.bus, &self.room, PresenceState::Closed).await;
        self.token.cancel();
    }

    async fn emit(bus: &Arc<dyn EventBus>, room: &RoomId, state: PresenceState) {
        // Fire-and-forget like every live event.
        let delivered = bus
            .publish(
                room,
                LiveEvent::Presence {
                    state,
                    timestamp: Utc::now(),
                },
            )
            .await;
        debug!(room = %room, state = state.as_str(), delivered, "Presence beacon");
    }
}

impl Drop for PresenceBeacon {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tavle_core::traits::bus::Subscription;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    /// Minimal bus double that records published events.
    struct RecordingBus {
        events: tokio::sync::Mutex<Vec<LiveEvent>>,
    }

    #[async_trait]
    impl EventBus for RecordingBus {
        async fn publish(&self, _room: &RoomId, event: LiveEvent) -> usize {
            self.events.lock().await.push(event);
            1
        }

        async fn subscribe(&self, room: &RoomId) -> Subscription {
            let (_tx, rx) = mpsc::channel(1);
            Subscription::new(room.clone(), rx, || {})
        }

        fn subscriber_count(&self, _room: &RoomId) -> usize {
            0
        }

        fn room_count(&self) -> usize {
            0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_beacons_open_on_interval() {
        let bus = Arc::new(RecordingBus {
            events: tokio::sync::Mutex::new(Vec::new()),
        });
        let room = RoomId::new("AB3F9Q", "Lærke");

        let beacon = PresenceBeacon::start(
            bus.clone(),
            room,
            Duration::from_millis(100),
        )
        .await;

        tokio::time::sleep(Duration::from_millis(250)).await;
        beacon.close().await;

        let events = bus.events.lock().await;
        // Initial beacon + two interval ticks + closed.
        assert!(events.len() >= 4);
        assert!(matches!(
            events.last(),
            Some(LiveEvent::Presence {
                state: PresenceState::Closed,
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_suppresses_interval_beacons() {
        let bus = Arc::new(RecordingBus {
            events: tokio::sync::Mutex::new(Vec::new()),
        });
        let room = RoomId::new("AB3F9Q", "Lærke");

        let beacon =
            PresenceBeacon::start(bus.clone(), room, Duration::from_millis(100)).await;
        beacon.set_state(PresenceState::Hidden).await;

        let before = bus.events.lock().await.len();
        tokio::time::sleep(Duration::from_millis(350)).await;
        let after = bus.events.lock().await.len();

        // No interval beacons while hidden.
        assert_eq!(before, after);
        drop(beacon);
    }
}
