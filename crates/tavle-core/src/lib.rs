//! # tavle-core
//!
//! Core crate for Tavle, the live classroom practice service. Contains
//! configuration schemas, the unified error system, typed identifiers,
//! the room addressing scheme, the live event taxonomy, and the trait
//! seams (`SessionDirectory`, `EventBus`) the other crates plug into.
//!
//! This crate has **no** internal dependencies on other Tavle crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
