//! # tavle-service
//!
//! Business logic over the session and participant stores: code
//! generation, canonicalizing lookup, the alias-collision join rule,
//! heartbeat touches, teacher eviction, and the expiry sweep.

pub mod session;

pub use session::service::SessionService;
