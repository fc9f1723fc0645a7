//! Session directory implementations available to clients.

pub mod http;

pub use http::HttpDirectory;
