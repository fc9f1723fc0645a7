//! Participant entity.

pub mod model;

pub use model::Participant;
