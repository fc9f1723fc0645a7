//! Presence tracking for the teacher view.

pub mod monitor;

pub use monitor::{PresenceMonitor, RoomPresence};
