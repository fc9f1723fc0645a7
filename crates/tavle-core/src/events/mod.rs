//! Domain events.

pub mod live;

pub use live::{LiveEvent, PresenceState};
