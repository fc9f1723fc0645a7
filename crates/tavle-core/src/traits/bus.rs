//! The event bus seam.
//!
//! Two interchangeable transport strategies implement this trait (see
//! `tavle-realtime`): the server-push stream registry and the managed
//! broadcast channel. Both deliver to every *currently* subscribed
//! handler, never to one that unsubscribed before `publish` returned,
//! and give no stronger guarantee than that — events are live-presence
//! signals, not durable records.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::events::live::LiveEvent;
use crate::types::room::RoomId;

/// Per-room publish/subscribe fabric.
#[async_trait]
pub trait EventBus: Send + Sync + 'static {
    /// Publish an event to a room. Returns the number of subscribers the
    /// event was handed to; publishing to an empty room is a no-op.
    /// Failures are swallowed — a failed publish never errors the caller.
    async fn publish(&self, room: &RoomId, event: LiveEvent) -> usize;

    /// Subscribe to a room. The subscription unsubscribes itself when
    /// dropped.
    async fn subscribe(&self, room: &RoomId) -> Subscription;

    /// Number of live subscribers for a room.
    fn subscriber_count(&self, room: &RoomId) -> usize;

    /// Number of rooms with at least one subscriber. Empty rooms are
    /// evicted eagerly, so this never grows unboundedly.
    fn room_count(&self) -> usize;
}

/// A live subscription to one room.
///
/// Dropping the subscription removes it from the transport's registry;
/// the guard runs exactly once.
pub struct Subscription {
    room: RoomId,
    receiver: mpsc::Receiver<LiveEvent>,
    guard: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Assemble a subscription from its parts. Transports call this;
    /// consumers only ever receive one.
    pub fn new(
        room: RoomId,
        receiver: mpsc::Receiver<LiveEvent>,
        on_unsubscribe: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            room,
            receiver,
            guard: Some(Box::new(on_unsubscribe)),
        }
    }

    /// The room this subscription listens on.
    pub fn room(&self) -> &RoomId {
        &self.room
    }

    /// Receive the next event. Returns `None` once the transport side
    /// has been torn down.
    pub async fn recv(&mut self) -> Option<LiveEvent> {
        self.receiver.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<LiveEvent> {
        self.receiver.try_recv().ok()
    }

    /// Tear the subscription down explicitly. Equivalent to dropping.
    pub fn unsubscribe(self) {}

    /// Take the raw receiver, leaving the unsubscribe guard attached to
    /// the returned handle. Used by the SSE layer to adapt the
    /// subscription into a response stream.
    pub fn into_parts(mut self) -> (RoomId, mpsc::Receiver<LiveEvent>, SubscriptionGuard) {
        let guard = SubscriptionGuard {
            on_drop: self.guard.take(),
        };
        let receiver = std::mem::replace(&mut self.receiver, mpsc::channel(1).1);
        (self.room.clone(), receiver, guard)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("room", &self.room)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            guard();
        }
    }
}

/// Runs a subscription's unsubscribe hook when dropped. Obtained from
/// [`Subscription::into_parts`] so the receiver can move into a stream
/// adapter without losing cleanup.
pub struct SubscriptionGuard {
    on_drop: Option<Box<dyn FnOnce() + Send>>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(guard) = self.on_drop.take() {
            guard();
        }
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard").finish()
    }
}
