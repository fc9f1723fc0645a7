//! The lifecycle state machine.
//!
//! All transitions go through [`transition`] under one lock; watcher
//! tasks, join responses, and user actions never mutate flags directly.
//! Each join attempt carries a generation number so a superseded join
//! or a stale watcher can never write over a newer identity.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use tavle_core::error::{AppError, ErrorKind};
use tavle_core::result::AppResult;
use tavle_core::traits::bus::EventBus;
use tavle_core::traits::directory::SessionDirectory;
use tavle_core::types::id::SessionId;
use tavle_core::types::room::{RoomId, canonicalize_code, normalize_alias};

use crate::config::ControllerConfig;
use crate::identity::generate_client_token;
use crate::identity::store::{IdentityScope, IdentityStore, StoredIdentity};

use super::state::{ControllerSnapshot, LeaveReason, Phase};
use super::watchers::{self, WatcherSet};

/// Callback invoked when the session becomes invalid (eviction, expiry).
pub type InvalidSessionCallback = Arc<dyn Fn(LeaveReason) + Send + Sync>;

pub(crate) struct Inner {
    pub phase: Phase,
    pub code: Option<String>,
    pub alias: Option<String>,
    pub session_id: Option<SessionId>,
    pub expires_at: Option<DateTime<Utc>>,
    pub room: Option<RoomId>,
    pub last_leave: Option<LeaveReason>,
    /// The (code, alias) pair of the in-flight join, if any.
    pub pending: Option<(String, String)>,
    /// Bumped on every new join attempt and every leave; watchers carry
    /// the generation they were armed under.
    pub generation: u64,
    /// Auto-rejoin fires at most once per pair per controller lifetime.
    pub rejoin_attempted: HashSet<(String, String)>,
    pub watchers: Option<WatcherSet>,
}

/// Single transition writer. Every phase change in the controller goes
/// through here.
fn transition(inner: &mut Inner, to: Phase) {
    if inner.phase != to {
        debug!(from = ?inner.phase, to = ?to, "Lifecycle transition");
        inner.phase = to;
    }
}

/// Client-side session lifecycle controller.
///
/// Coordinates hydration, join/auto-rejoin, the heartbeat, the exact
/// expiry timer, the poll watchdog, and the push eviction path into one
/// consistent joined/room view.
pub struct LifecycleController {
    pub(crate) directory: Arc<dyn SessionDirectory>,
    pub(crate) identity: Arc<dyn IdentityStore>,
    /// Push transport for low-latency eviction; `None` in deployments
    /// without push capability (the heartbeat/poll fallback still works).
    pub(crate) push: Option<Arc<dyn EventBus>>,
    pub(crate) config: ControllerConfig,
    /// Self-reference handed to watcher tasks; they upgrade per use so
    /// a dropped controller stops receiving stale writes.
    pub(crate) weak: Weak<Self>,
    on_invalid: std::sync::Mutex<Option<InvalidSessionCallback>>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController").finish()
    }
}

impl LifecycleController {
    /// Create a controller. Pass `push` to enable the low-latency
    /// eviction path alongside the heartbeat/poll fallback.
    pub fn new(
        directory: Arc<dyn SessionDirectory>,
        identity: Arc<dyn IdentityStore>,
        push: Option<Arc<dyn EventBus>>,
        config: ControllerConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            directory,
            identity,
            push,
            config,
            weak: weak.clone(),
            on_invalid: std::sync::Mutex::new(None),
            inner: Mutex::new(Inner {
                phase: Phase::Unidentified,
                code: None,
                alias: None,
                session_id: None,
                expires_at: None,
                room: None,
                last_leave: None,
                pending: None,
                generation: 0,
                rejoin_attempted: HashSet::new(),
                watchers: None,
            }),
        })
    }

    /// Register the invalid-session callback (e.g. a redirect).
    pub fn on_invalid_session(&self, callback: impl Fn(LeaveReason) + Send + Sync + 'static) {
        *self.on_invalid.lock().expect("callback lock poisoned") = Some(Arc::new(callback));
    }

    /// Load persisted identity. The global slot wins and is re-persisted
    /// into the activity slot, reconciling identity across activities;
    /// the activity slot is used only when no global identity exists.
    pub async fn hydrate(&self) -> AppResult<Option<StoredIdentity>> {
        let resolved = match self.identity.load(IdentityScope::Global).await? {
            Some(global) => {
                self.identity.save(IdentityScope::Activity, &global).await?;
                Some(global)
            }
            None => self.identity.load(IdentityScope::Activity).await?,
        };

        let mut inner = self.inner.lock().await;
        if inner.phase == Phase::Unidentified {
            if let Some(identity) = &resolved {
                inner.code = Some(identity.session_code.clone());
                inner.alias = Some(identity.alias.clone());
                transition(&mut inner, Phase::Identified);
            }
        }

        Ok(resolved)
    }

    /// Apply a session code supplied out-of-band (URL query parameter).
    /// Forces re-identification; never auto-joins by itself.
    pub async fn override_session_code(&self, code: &str) {
        let code = canonicalize_code(code);
        if code.is_empty() {
            return;
        }

        let needs_leave = {
            let inner = self.inner.lock().await;
            inner.phase == Phase::Joined && inner.code.as_deref() != Some(code.as_str())
        };
        if needs_leave {
            self.leave().await;
        }

        let mut inner = self.inner.lock().await;
        inner.code = Some(code);
        transition(&mut inner, Phase::Identified);
    }

    /// Attempt the automatic rejoin for a hydrated identity. Fires at
    /// most once per (code, alias) pair per controller lifetime.
    /// Returns whether a join was attempted.
    pub async fn auto_rejoin(&self) -> AppResult<bool> {
        let (code, alias) = {
            let mut inner = self.inner.lock().await;
            if inner.phase != Phase::Identified {
                return Ok(false);
            }
            let (Some(code), Some(alias)) = (inner.code.clone(), inner.alias.clone()) else {
                return Ok(false);
            };
            let pair = (code.clone(), alias.clone());
            if inner.rejoin_attempted.contains(&pair) {
                return Ok(false);
            }
            inner.rejoin_attempted.insert(pair);
            (code, alias)
        };

        match self.join(&code, &alias).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_transient() => Err(e),
            Err(e) => {
                // Terminal rejection of a persisted identity: drop it so
                // the next page load starts clean.
                warn!(code = %code, alias = %alias, error = %e, "Auto-rejoin rejected, clearing identity");
                let reason = match e.kind {
                    ErrorKind::Expired => LeaveReason::Expired {
                        message: "Session has expired".to_string(),
                    },
                    _ => LeaveReason::Expired {
                        message: "Session is no longer valid".to_string(),
                    },
                };
                let generation = self.inner.lock().await.generation;
                self.force_leave(generation, reason).await;
                Ok(false)
            }
        }
    }

    /// Join a session.
    ///
    /// Re-entrant calls with the same (code, alias) pair while a join is
    /// in flight are suppressed; a different pair supersedes the
    /// in-flight attempt. On success the controller is `Joined`, local
    /// identity is persisted at both scopes, and all watchers are armed.
    pub async fn join(&self, code: &str, alias: &str) -> AppResult<()> {
        let code = canonicalize_code(code);
        let alias = normalize_alias(alias);
        if code.is_empty() {
            return Err(AppError::validation("Session code must not be empty"));
        }
        if alias.is_empty() {
            return Err(AppError::validation("Alias must not be empty"));
        }

        let pair = (code.clone(), alias.clone());
        let my_generation;
        let superseded_watchers;
        {
            let mut inner = self.inner.lock().await;

            // Idempotent join guard: the same pair in flight is a no-op.
            if inner.phase == Phase::Joining && inner.pending.as_ref() == Some(&pair) {
                debug!(code = %code, alias = %alias, "Join already in flight, suppressed");
                return Ok(());
            }

            inner.generation += 1;
            my_generation = inner.generation;
            superseded_watchers = inner.watchers.take();

            inner.code = Some(code.clone());
            inner.alias = Some(alias.clone());
            inner.pending = Some(pair);
            transition(&mut inner, Phase::Joining);
        }

        if let Some(watchers) = superseded_watchers {
            watchers.cancel();
        }

        // Reuse the token from a previous join of this pair so the same
        // device reconnects silently.
        let token = match self.identity.token_for(&code, &alias).await? {
            Some(token) => token,
            None => generate_client_token(),
        };

        let result = self.directory.join(&code, &alias, &token).await;

        {
            let mut inner = self.inner.lock().await;
            if inner.generation != my_generation {
                // A newer join or a leave superseded this attempt.
                debug!(code = %code, alias = %alias, "Join result discarded, superseded");
                return Ok(());
            }

            match result {
                Ok(grant) => {
                    inner.session_id = Some(grant.session_id);
                    inner.expires_at = Some(grant.expires_at);
                    inner.room = Some(grant.room.clone());
                    inner.pending = None;
                    transition(&mut inner, Phase::Joined);
                    inner.watchers = Some(watchers::arm(self, &grant, my_generation));
                    info!(room = %grant.room, "Joined session");
                }
                Err(e) => {
                    inner.pending = None;
                    transition(&mut inner, Phase::Identified);
                    return Err(e);
                }
            }
        }

        // Persist identity at both scopes plus the pair's token.
        // Best-effort: the join itself already succeeded, a storage
        // failure only costs the next auto-rejoin.
        let identity = StoredIdentity {
            session_code: code.clone(),
            alias: alias.clone(),
        };
        if let Err(e) = self.identity.save(IdentityScope::Global, &identity).await {
            warn!(error = %e, "Failed to persist global identity");
        }
        if let Err(e) = self.identity.save(IdentityScope::Activity, &identity).await {
            warn!(error = %e, "Failed to persist activity identity");
        }
        if let Err(e) = self.identity.save_token(&code, &alias, &token).await {
            warn!(error = %e, "Failed to persist client token");
        }

        Ok(())
    }

    /// User-initiated leave.
    pub async fn leave(&self) {
        let generation = self.inner.lock().await.generation;
        self.force_leave(generation, LeaveReason::Left).await;
    }

    /// The single teardown entry point, fed by the user, the heartbeat,
    /// the expiry timer, the poll watchdog, and the push eviction path.
    ///
    /// A stale caller (superseded generation) is ignored. In-memory
    /// fields reset under one lock, so consumers never observe an
    /// intermediate state.
    pub async fn force_leave(&self, generation: u64, reason: LeaveReason) {
        let cleared_pair;
        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                debug!(?reason, "Stale force-leave ignored");
                return;
            }
            inner.generation += 1;

            if let Some(watchers) = inner.watchers.take() {
                watchers.cancel();
            }

            cleared_pair = inner.code.clone().zip(inner.alias.clone());

            let terminal = match &reason {
                LeaveReason::Left => Phase::Leaving,
                LeaveReason::Evicted { .. } => Phase::Evicted,
                LeaveReason::Expired { .. } => Phase::Expired,
            };
            transition(&mut inner, terminal);

            inner.code = None;
            inner.alias = None;
            inner.session_id = None;
            inner.expires_at = None;
            inner.room = None;
            inner.pending = None;
            inner.last_leave = Some(reason.clone());
            transition(&mut inner, Phase::Unidentified);
        }

        info!(?reason, "Left session");

        // Identity cleanup is best-effort; a failed clear only means a
        // future auto-rejoin gets a terminal rejection.
        if let Err(e) = self.identity.clear(IdentityScope::Global).await {
            warn!(error = %e, "Failed to clear global identity");
        }
        if let Err(e) = self.identity.clear(IdentityScope::Activity).await {
            warn!(error = %e, "Failed to clear activity identity");
        }
        if let Some((code, alias)) = cleared_pair {
            if let Err(e) = self.identity.clear_token(&code, &alias).await {
                warn!(error = %e, "Failed to clear client token");
            }
        }

        if reason.is_terminal() {
            let callback = self
                .on_invalid
                .lock()
                .expect("callback lock poisoned")
                .clone();
            if let Some(callback) = callback {
                callback(reason);
            }
        }
    }

    /// A consistent snapshot of the controller's output fields.
    pub async fn snapshot(&self) -> ControllerSnapshot {
        let inner = self.inner.lock().await;
        let joined = inner.phase == Phase::Joined;
        ControllerSnapshot {
            phase: inner.phase,
            session_code: inner.code.clone(),
            alias: inner.alias.clone(),
            session_id: inner.session_id,
            expires_at: inner.expires_at,
            room: if joined { inner.room.clone() } else { None },
            joined,
            last_leave: inner.last_leave.clone(),
        }
    }
}
