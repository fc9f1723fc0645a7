//! HTTP request handlers.

pub mod events;
pub mod health;
pub mod rooms;
pub mod session;
