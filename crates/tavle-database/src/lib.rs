//! # tavle-database
//!
//! PostgreSQL access for Tavle: connection pool management, the
//! migration runner, and the session/participant repositories.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
