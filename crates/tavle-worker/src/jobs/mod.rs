//! Built-in job handler implementations.

pub mod maintenance;

pub use maintenance::MaintenanceJobHandler;
