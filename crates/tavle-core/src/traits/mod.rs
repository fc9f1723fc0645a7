//! Trait seams between the Tavle crates.

pub mod bus;
pub mod directory;

pub use bus::{EventBus, Subscription};
pub use directory::SessionDirectory;
