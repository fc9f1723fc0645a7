//! # tavle-api
//!
//! HTTP surface for Tavle: session create/lookup/join, heartbeat and
//! eviction, event publish, the SSE event stream, the teacher room
//! list, and health checks.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
