//! # tavle-worker
//!
//! Scheduled maintenance for Tavle:
//! - the expired-session sweep (idempotent, safe alongside live lookups)
//! - presence-monitor reconciliation (bounds tracked-room memory)

pub mod jobs;
pub mod scheduler;

pub use scheduler::CronScheduler;
