//! # tavle-client
//!
//! The student-side session lifecycle: an explicit state machine
//! ([`LifecycleController`]) coordinating join, auto-rejoin, heartbeat,
//! expiry, and eviction into one consistent joined/room view; a local
//! persisted identity store with global and per-activity scopes; and an
//! HTTP implementation of the session directory.
//!
//! Many independent asynchronous sources (timers, network callbacks,
//! push events) write to the controller's state, so every mutation goes
//! through one transition writer behind one lock.

pub mod config;
pub mod controller;
pub mod directory;
pub mod identity;
pub mod presence;

pub use config::ControllerConfig;
pub use controller::machine::LifecycleController;
pub use controller::state::{ControllerSnapshot, LeaveReason, Phase};
pub use directory::http::HttpDirectory;
pub use identity::store::{IdentityScope, IdentityStore, MemoryIdentityStore, StoredIdentity};
pub use presence::PresenceBeacon;
