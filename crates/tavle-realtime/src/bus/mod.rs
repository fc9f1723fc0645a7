//! Event bus transports.
//!
//! Both transports implement `tavle_core::traits::bus::EventBus` and are
//! selectable per deployment; callers never see past the trait.

pub mod broadcast_hub;
pub mod stream_hub;
