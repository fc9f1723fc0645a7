//! File-backed identity store.
//!
//! One JSON file holds the global slot, every activity slot, and the
//! token map, mirroring a browser's local storage surviving restarts.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use tavle_core::error::{AppError, ErrorKind};
use tavle_core::result::AppResult;

use super::store::{IdentityScope, IdentityState, IdentityStore, StoredIdentity, token_key};

/// Identity store persisting to a JSON file.
#[derive(Debug)]
pub struct FileIdentityStore {
    path: PathBuf,
    activity: String,
    /// Serializes read-modify-write cycles against the file.
    lock: Mutex<()>,
}

impl FileIdentityStore {
    /// Open (or lazily create) a store at the given path, scoped to the
    /// given activity.
    pub fn new(path: impl Into<PathBuf>, activity: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            activity: activity.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_state(&self) -> AppResult<IdentityState> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AppError::with_source(ErrorKind::Serialization, "Corrupt identity file", e)
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(IdentityState::default()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Internal,
                "Failed to read identity file",
                e,
            )),
        }
    }

    async fn write_state(&self, state: &IdentityState) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(ErrorKind::Internal, "Failed to create identity dir", e)
            })?;
        }

        let bytes = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&self.path, bytes).await.map_err(|e| {
            AppError::with_source(ErrorKind::Internal, "Failed to write identity file", e)
        })?;

        debug!(path = %self.path.display(), "Persisted local identity");
        Ok(())
    }

    async fn update<F>(&self, mutate: F) -> AppResult<()>
    where
        F: FnOnce(&mut IdentityState),
    {
        let _guard = self.lock.lock().await;
        let mut state = self.read_state().await?;
        mutate(&mut state);
        self.write_state(&state).await
    }
}

#[async_trait]
impl IdentityStore for FileIdentityStore {
    async fn load(&self, scope: IdentityScope) -> AppResult<Option<StoredIdentity>> {
        let _guard = self.lock.lock().await;
        let state = self.read_state().await?;
        Ok(match scope {
            IdentityScope::Global => state.global,
            IdentityScope::Activity => state.activities.get(&self.activity).cloned(),
        })
    }

    async fn save(&self, scope: IdentityScope, identity: &StoredIdentity) -> AppResult<()> {
        let activity = self.activity.clone();
        let identity = identity.clone();
        self.update(move |state| match scope {
            IdentityScope::Global => state.global = Some(identity),
            IdentityScope::Activity => {
                state.activities.insert(activity, identity);
            }
        })
        .await
    }

    async fn clear(&self, scope: IdentityScope) -> AppResult<()> {
        let activity = self.activity.clone();
        self.update(move |state| match scope {
            IdentityScope::Global => state.global = None,
            IdentityScope::Activity => {
                state.activities.remove(&activity);
            }
        })
        .await
    }

    async fn token_for(&self, code: &str, alias: &str) -> AppResult<Option<String>> {
        let _guard = self.lock.lock().await;
        let state = self.read_state().await?;
        Ok(state.tokens.get(&token_key(code, alias)).cloned())
    }

    async fn save_token(&self, code: &str, alias: &str, token: &str) -> AppResult<()> {
        let key = token_key(code, alias);
        let token = token.to_string();
        self.update(move |state| {
            state.tokens.insert(key, token);
        })
        .await
    }

    async fn clear_token(&self, code: &str, alias: &str) -> AppResult<()> {
        let key = token_key(code, alias);
        self.update(move |state| {
            state.tokens.remove(&key);
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = std::env::temp_dir().join(format!("tavle-id-{}", std::process::id()));
        let store = FileIdentityStore::new(dir.join("none.json"), "practice");
        assert_eq!(store.load(IdentityScope::Global).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let dir = std::env::temp_dir().join(format!("tavle-id-rt-{}", std::process::id()));
        let path = dir.join("identity.json");
        let identity = StoredIdentity {
            session_code: "AB3F9Q".into(),
            alias: "Lærke".into(),
        };

        {
            let store = FileIdentityStore::new(&path, "practice");
            store.save(IdentityScope::Global, &identity).await.unwrap();
            store.save_token("AB3F9Q", "Lærke", "tok-1").await.unwrap();
        }

        let reopened = FileIdentityStore::new(&path, "practice");
        assert_eq!(
            reopened.load(IdentityScope::Global).await.unwrap(),
            Some(identity)
        );
        assert_eq!(
            reopened
                .token_for("AB3F9Q", "Lærke")
                .await
                .unwrap()
                .as_deref(),
            Some("tok-1")
        );

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
