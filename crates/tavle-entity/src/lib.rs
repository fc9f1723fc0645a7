//! # tavle-entity
//!
//! Domain entity models for Tavle: the durable session and participant
//! rows. Live events are not entities — they are never persisted and
//! live in `tavle-core::events`.

pub mod participant;
pub mod session;

pub use participant::Participant;
pub use session::Session;
