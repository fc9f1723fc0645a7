//! The session lifecycle controller.

pub mod machine;
pub mod state;
pub(crate) mod watchers;

pub use machine::LifecycleController;
pub use state::{ControllerSnapshot, LeaveReason, Phase};
