//! Identity store seam and the in-memory implementation.
//!
//! Identity lives at two scopes: a global (cross-activity) slot and a
//! per-activity slot, plus a token map keyed by (session, alias). The
//! controller writes all of them on a successful join and clears them
//! on leave, eviction, and expiry.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use tavle_core::result::AppResult;

/// Which identity slot to read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityScope {
    /// Shared across all practice activities in this client.
    Global,
    /// Scoped to the activity this store was opened for.
    Activity,
}

/// A persisted identity: enough to auto-rejoin after a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIdentity {
    /// Canonical session code.
    pub session_code: String,
    /// Normalized alias.
    pub alias: String,
}

/// Client-held identity persistence.
#[async_trait]
pub trait IdentityStore: Send + Sync + 'static {
    /// Read the identity at a scope.
    async fn load(&self, scope: IdentityScope) -> AppResult<Option<StoredIdentity>>;

    /// Write the identity at a scope.
    async fn save(&self, scope: IdentityScope, identity: &StoredIdentity) -> AppResult<()>;

    /// Clear the identity at a scope.
    async fn clear(&self, scope: IdentityScope) -> AppResult<()>;

    /// The client token previously used for this (session, alias) pair.
    async fn token_for(&self, code: &str, alias: &str) -> AppResult<Option<String>>;

    /// Remember the client token for a (session, alias) pair.
    async fn save_token(&self, code: &str, alias: &str, token: &str) -> AppResult<()>;

    /// Forget the token for a (session, alias) pair.
    async fn clear_token(&self, code: &str, alias: &str) -> AppResult<()>;
}

/// The serialized shape shared by the memory and file stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct IdentityState {
    /// Global identity slot.
    pub global: Option<StoredIdentity>,
    /// Activity name → identity slot.
    pub activities: HashMap<String, StoredIdentity>,
    /// "code:alias" → client token.
    pub tokens: HashMap<String, String>,
}

pub(crate) fn token_key(code: &str, alias: &str) -> String {
    format!("{code}:{alias}")
}

/// In-memory identity store, used in tests and ephemeral embeddings.
#[derive(Debug)]
pub struct MemoryIdentityStore {
    activity: String,
    state: Mutex<IdentityState>,
}

impl MemoryIdentityStore {
    /// Create an empty store scoped to the given activity.
    pub fn new(activity: impl Into<String>) -> Self {
        Self {
            activity: activity.into(),
            state: Mutex::new(IdentityState::default()),
        }
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn load(&self, scope: IdentityScope) -> AppResult<Option<StoredIdentity>> {
        let state = self.state.lock().await;
        Ok(match scope {
            IdentityScope::Global => state.global.clone(),
            IdentityScope::Activity => state.activities.get(&self.activity).cloned(),
        })
    }

    async fn save(&self, scope: IdentityScope, identity: &StoredIdentity) -> AppResult<()> {
        let mut state = self.state.lock().await;
        match scope {
            IdentityScope::Global => state.global = Some(identity.clone()),
            IdentityScope::Activity => {
                state
                    .activities
                    .insert(self.activity.clone(), identity.clone());
            }
        }
        Ok(())
    }

    async fn clear(&self, scope: IdentityScope) -> AppResult<()> {
        let mut state = self.state.lock().await;
        match scope {
            IdentityScope::Global => state.global = None,
            IdentityScope::Activity => {
                state.activities.remove(&self.activity);
            }
        }
        Ok(())
    }

    async fn token_for(&self, code: &str, alias: &str) -> AppResult<Option<String>> {
        let state = self.state.lock().await;
        Ok(state.tokens.get(&token_key(code, alias)).cloned())
    }

    async fn save_token(&self, code: &str, alias: &str, token: &str) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.tokens.insert(token_key(code, alias), token.to_string());
        Ok(())
    }

    async fn clear_token(&self, code: &str, alias: &str) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.tokens.remove(&token_key(code, alias));
        Ok(())
    }
}
