//! Local persisted identity.

pub mod file_store;
pub mod store;

pub use file_store::FileIdentityStore;
pub use store::{IdentityScope, IdentityStore, MemoryIdentityStore, StoredIdentity};

use rand::Rng;

/// Generate an opaque per-client token identifying this device for a
/// given (session, alias) pair.
pub fn generate_client_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..16).map(|_| rng.gen()).collect();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
