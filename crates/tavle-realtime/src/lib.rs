//! # tavle-realtime
//!
//! Real-time fabric for Tavle. Provides:
//!
//! - The per-room event bus in two interchangeable transports:
//!   [`StreamHub`] (server-push registry) and [`BroadcastHub`]
//!   (managed per-room channels)
//! - Consumer-side timestamp ordering for whiteboard events
//!   ([`CanvasProjection`])
//! - Teacher-view presence tracking with timeout-based closed detection
//!   ([`PresenceMonitor`])
//! - The [`LiveHub`] facade tying transport and presence together

pub mod bus;
pub mod canvas;
pub mod hub;
pub mod presence;

pub use bus::broadcast_hub::BroadcastHub;
pub use bus::stream_hub::StreamHub;
pub use canvas::CanvasProjection;
pub use hub::{LiveHub, Transport};
pub use presence::monitor::PresenceMonitor;
