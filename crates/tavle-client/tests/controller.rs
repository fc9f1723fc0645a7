//! Lifecycle controller integration tests against an in-memory
//! directory and the broadcast transport. Time-sensitive paths run
//! under paused tokio time with short intervals.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use tavle_client::{
    ControllerConfig, IdentityScope, IdentityStore, LeaveReason, LifecycleController,
    MemoryIdentityStore, Phase, StoredIdentity,
};
use tavle_core::error::{AppError, ErrorKind};
use tavle_core::result::AppResult;
use tavle_core::traits::directory::{
    CreatedSession, JoinGrant, SessionDirectory, SessionSummary, TouchOutcome,
};
use tavle_core::types::id::SessionId;
use tavle_core::types::room::{RoomId, canonicalize_code, normalize_alias};
use tavle_realtime::{LiveHub, Transport};

const CODE: &str = "AB3F9Q";

#[derive(Debug, Clone)]
struct ParticipantRow {
    token: String,
    last_seen: DateTime<Utc>,
}

/// In-memory stand-in for the server-side session directory.
struct MemoryDirectory {
    sessions: Mutex<HashMap<String, SessionSummary>>,
    participants: Mutex<HashMap<(String, String), ParticipantRow>>,
    freshness: Duration,
    join_delay: Option<StdDuration>,
    join_calls: AtomicUsize,
    hub: LiveHub,
}

impl MemoryDirectory {
    fn new(hub: LiveHub) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            participants: Mutex::new(HashMap::new()),
            freshness: Duration::seconds(120),
            join_delay: None,
            join_calls: AtomicUsize::new(0),
            hub,
        }
    }

    fn with_join_delay(mut self, delay: StdDuration) -> Self {
        self.join_delay = Some(delay);
        self
    }

    async fn add_session(&self, code: &str, expires_in: Duration) -> SessionSummary {
        let now = Utc::now();
        let summary = SessionSummary {
            id: SessionId::new(),
            code: code.to_string(),
            created_at: now,
            expires_at: now + expires_in,
        };
        self.sessions
            .lock()
            .await
            .insert(code.to_string(), summary.clone());
        summary
    }

    async fn insert_participant(&self, code: &str, alias: &str, token: &str, seen_ago: Duration) {
        self.participants.lock().await.insert(
            (code.to_string(), alias.to_string()),
            ParticipantRow {
                token: token.to_string(),
                last_seen: Utc::now() - seen_ago,
            },
        );
    }

    async fn remove_participant(&self, code: &str, alias: &str) {
        self.participants
            .lock()
            .await
            .remove(&(code.to_string(), alias.to_string()));
    }

    async fn token_of(&self, code: &str, alias: &str) -> Option<String> {
        self.participants
            .lock()
            .await
            .get(&(code.to_string(), alias.to_string()))
            .map(|row| row.token.clone())
    }
}

#[async_trait]
impl SessionDirectory for MemoryDirectory {
    async fn create_session(&self) -> AppResult<CreatedSession> {
        let summary = self.add_session(CODE, Duration::minutes(90)).await;
        Ok(CreatedSession {
            code: summary.code,
            expires_at: summary.expires_at,
        })
    }

    async fn lookup_session(&self, code: &str) -> AppResult<Option<SessionSummary>> {
        let code = canonicalize_code(code);
        let sessions = self.sessions.lock().await;
        Ok(sessions
            .get(&code)
            .filter(|s| s.expires_at > Utc::now())
            .cloned())
    }

    async fn join(&self, code: &str, alias: &str, client_token: &str) -> AppResult<JoinGrant> {
        if let Some(delay) = self.join_delay {
            tokio::time::sleep(delay).await;
        }
        self.join_calls.fetch_add(1, Ordering::SeqCst);

        let code = canonicalize_code(code);
        let alias = normalize_alias(alias);
        let now = Utc::now();

        let session = {
            let sessions = self.sessions.lock().await;
            sessions
                .get(&code)
                .cloned()
                .ok_or_else(|| AppError::not_found("Session does not exist"))?
        };
        if now >= session.expires_at {
            return Err(AppError::expired("Session has expired"));
        }

        let mut participants = self.participants.lock().await;
        let key = (code.clone(), alias.clone());
        if let Some(row) = participants.get(&key) {
            let fresh = now - row.last_seen <= self.freshness;
            if fresh && row.token != client_token {
                return Err(AppError::alias_taken("Alias is already in use"));
            }
        }
        participants.insert(
            key,
            ParticipantRow {
                token: client_token.to_string(),
                last_seen: now,
            },
        );

        Ok(JoinGrant {
            session_id: session.id,
            code: code.clone(),
            alias: alias.clone(),
            room: RoomId::new(&code, &alias),
            expires_at: session.expires_at,
        })
    }

    async fn touch(&self, code: &str, alias: &str) -> AppResult<TouchOutcome> {
        let key = (canonicalize_code(code), normalize_alias(alias));
        let mut participants = self.participants.lock().await;
        match participants.get_mut(&key) {
            Some(row) => {
                row.last_seen = Utc::now();
                Ok(TouchOutcome::Alive)
            }
            None => Ok(TouchOutcome::Removed),
        }
    }

    async fn evict(&self, code: &str, alias: &str, reason: &str) -> AppResult<()> {
        let code = canonicalize_code(code);
        let alias = normalize_alias(alias);
        let removed = self
            .participants
            .lock()
            .await
            .remove(&(code.clone(), alias.clone()))
            .is_some();
        if !removed {
            return Err(AppError::not_found("Participant not found"));
        }
        self.hub.kick(&RoomId::new(&code, &alias), reason).await;
        Ok(())
    }
}

struct Harness {
    directory: Arc<MemoryDirectory>,
    identity: Arc<MemoryIdentityStore>,
    controller: Arc<LifecycleController>,
    hub: LiveHub,
}

fn harness_with(directory: MemoryDirectory, hub: LiveHub, config: ControllerConfig) -> Harness {
    let directory = Arc::new(directory);
    let identity = Arc::new(MemoryIdentityStore::new("practice"));
    let controller = LifecycleController::new(
        directory.clone(),
        identity.clone(),
        Some(hub.bus()),
        config,
    );
    Harness {
        directory,
        identity,
        controller,
        hub,
    }
}

fn harness() -> Harness {
    let hub = LiveHub::new(&Default::default(), Transport::Broadcast);
    harness_with(MemoryDirectory::new(hub.clone()), hub, fast_config())
}

fn fast_config() -> ControllerConfig {
    ControllerConfig {
        heartbeat_interval: StdDuration::from_millis(100),
        poll_interval: StdDuration::from_millis(500),
    }
}

/// Let spawned watcher tasks run and timers fire.
async fn settle(ms: u64) {
    tokio::time::sleep(StdDuration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_join_produces_room_and_persists_identity() {
    let h = harness();
    h.directory.add_session(CODE, Duration::minutes(90)).await;

    h.controller.join(CODE, " Lærke ").await.unwrap();

    let snapshot = h.controller.snapshot().await;
    assert_eq!(snapshot.phase, Phase::Joined);
    assert!(snapshot.joined);
    assert_eq!(snapshot.room.as_ref().unwrap().as_str(), "AB3F9Q:Lærke");

    let global = h.identity.load(IdentityScope::Global).await.unwrap();
    let activity = h.identity.load(IdentityScope::Activity).await.unwrap();
    assert_eq!(global.as_ref().unwrap().alias, "Lærke");
    assert_eq!(global, activity);
    assert!(
        h.identity
            .token_for(CODE, "Lærke")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test(start_paused = true)]
async fn test_join_lowercases_code_and_strips_alias_delimiter() {
    let h = harness();
    h.directory.add_session(CODE, Duration::minutes(90)).await;

    h.controller.join("ab3f9q", "Lær:ke").await.unwrap();
    let snapshot = h.controller.snapshot().await;
    assert_eq!(snapshot.session_code.as_deref(), Some("AB3F9Q"));
    assert_eq!(snapshot.alias.as_deref(), Some("Lærke"));
}

#[tokio::test(start_paused = true)]
async fn test_room_absent_unless_joined() {
    let h = harness();
    assert!(h.controller.snapshot().await.room.is_none());

    h.directory.add_session(CODE, Duration::minutes(90)).await;
    h.controller.join(CODE, "Lærke").await.unwrap();
    assert!(h.controller.snapshot().await.room.is_some());

    h.controller.leave().await;
    let snapshot = h.controller.snapshot().await;
    assert!(!snapshot.joined);
    assert!(snapshot.room.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_session_is_terminal_not_found() {
    let h = harness();
    let err = h.controller.join("QQQQQQ", "Lærke").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(h.controller.snapshot().await.phase, Phase::Identified);
}

#[tokio::test(start_paused = true)]
async fn test_expired_session_is_distinct_error() {
    let h = harness();
    h.directory.add_session(CODE, Duration::seconds(-1)).await;
    let err = h.controller.join(CODE, "Lærke").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Expired);
}

#[tokio::test(start_paused = true)]
async fn test_empty_alias_rejected() {
    let h = harness();
    let err = h.controller.join(CODE, " ::: ").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test(start_paused = true)]
async fn test_same_device_rejoin_succeeds() {
    let h = harness();
    h.directory.add_session(CODE, Duration::minutes(90)).await;

    h.controller.join(CODE, "Lærke").await.unwrap();
    // Second join with the same pair reuses the stored token and must
    // not produce AliasTaken.
    h.controller.join(CODE, "Lærke").await.unwrap();
    assert!(h.controller.snapshot().await.joined);
}

#[tokio::test(start_paused = true)]
async fn test_fresh_alias_on_other_device_is_taken() {
    let h = harness();
    h.directory.add_session(CODE, Duration::minutes(90)).await;
    h.directory
        .insert_participant(CODE, "Lærke", "other-device", Duration::seconds(5))
        .await;

    let err = h.controller.join(CODE, "Lærke").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::AliasTaken);
    assert!(!h.controller.snapshot().await.joined);
}

#[tokio::test(start_paused = true)]
async fn test_stale_alias_takeover_overwrites_token() {
    let h = harness();
    h.directory.add_session(CODE, Duration::minutes(90)).await;
    h.directory
        .insert_participant(CODE, "Lærke", "other-device", Duration::seconds(300))
        .await;

    h.controller.join(CODE, "Lærke").await.unwrap();
    let token = h.directory.token_of(CODE, "Lærke").await.unwrap();
    assert_ne!(token, "other-device");
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_join_with_same_pair_is_suppressed() {
    let hub = LiveHub::new(&Default::default(), Transport::Broadcast);
    let directory =
        MemoryDirectory::new(hub.clone()).with_join_delay(StdDuration::from_millis(100));
    let h = harness_with(directory, hub, fast_config());
    h.directory.add_session(CODE, Duration::minutes(90)).await;

    let controller = h.controller.clone();
    let first = tokio::spawn(async move { controller.join(CODE, "Lærke").await });
    settle(10).await;
    assert_eq!(h.controller.snapshot().await.phase, Phase::Joining);

    // Same pair while in flight: suppressed, no second request.
    h.controller.join(CODE, "Lærke").await.unwrap();

    first.await.unwrap().unwrap();
    assert!(h.controller.snapshot().await.joined);
    assert_eq!(h.directory.join_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_different_pair_supersedes_in_flight_join() {
    let hub = LiveHub::new(&Default::default(), Transport::Broadcast);
    let directory =
        MemoryDirectory::new(hub.clone()).with_join_delay(StdDuration::from_millis(100));
    let h = harness_with(directory, hub, fast_config());
    h.directory.add_session(CODE, Duration::minutes(90)).await;

    let controller = h.controller.clone();
    let first = tokio::spawn(async move { controller.join(CODE, "Lærke").await });
    settle(10).await;

    h.controller.join(CODE, "Mads").await.unwrap();
    // The first attempt resolves later but its result is discarded.
    first.await.unwrap().unwrap();

    let snapshot = h.controller.snapshot().await;
    assert!(snapshot.joined);
    assert_eq!(snapshot.alias.as_deref(), Some("Mads"));
    assert_eq!(h.directory.join_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_push_eviction_leaves_immediately() {
    let h = harness();
    h.directory.add_session(CODE, Duration::minutes(90)).await;

    let (callback_tx, mut callback_rx) = tokio::sync::mpsc::unbounded_channel();
    h.controller.on_invalid_session(move |reason| {
        let _ = callback_tx.send(reason);
    });

    h.controller.join(CODE, "Lærke").await.unwrap();
    settle(10).await; // let the push watcher subscribe

    h.directory
        .evict(CODE, "Lærke", "Removed by teacher")
        .await
        .unwrap();
    settle(10).await;

    let snapshot = h.controller.snapshot().await;
    assert!(!snapshot.joined);
    assert_eq!(
        snapshot.last_leave,
        Some(LeaveReason::Evicted {
            message: "Removed by teacher".to_string()
        })
    );

    // Local identity cleared at both scopes, token entry included.
    assert_eq!(h.identity.load(IdentityScope::Global).await.unwrap(), None);
    assert_eq!(
        h.identity.load(IdentityScope::Activity).await.unwrap(),
        None
    );
    assert_eq!(h.identity.token_for(CODE, "Lærke").await.unwrap(), None);

    let reason = callback_rx.recv().await.unwrap();
    assert!(reason.is_terminal());
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_fallback_detects_eviction() {
    // No push transport: only the heartbeat can notice the removal.
    let hub = LiveHub::new(&Default::default(), Transport::Broadcast);
    let directory = Arc::new(MemoryDirectory::new(hub.clone()));
    let identity = Arc::new(MemoryIdentityStore::new("practice"));
    let controller =
        LifecycleController::new(directory.clone(), identity.clone(), None, fast_config());

    directory.add_session(CODE, Duration::minutes(90)).await;
    controller.join(CODE, "Lærke").await.unwrap();

    directory.remove_participant(CODE, "Lærke").await;
    settle(250).await; // past two heartbeat ticks

    let snapshot = controller.snapshot().await;
    assert!(!snapshot.joined);
    assert!(matches!(
        snapshot.last_leave,
        Some(LeaveReason::Evicted { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_expiry_timer_fires_before_heartbeat() {
    let hub = LiveHub::new(&Default::default(), Transport::Broadcast);
    let directory = MemoryDirectory::new(hub.clone());
    // Heartbeat far in the future; only the expiry timer can fire first.
    let config = ControllerConfig {
        heartbeat_interval: StdDuration::from_secs(3600),
        poll_interval: StdDuration::from_secs(3600),
    };
    let h = harness_with(directory, hub, config);
    h.directory.add_session(CODE, Duration::milliseconds(200)).await;

    h.controller.join(CODE, "Lærke").await.unwrap();
    settle(400).await;

    let snapshot = h.controller.snapshot().await;
    assert!(!snapshot.joined);
    assert!(matches!(
        snapshot.last_leave,
        Some(LeaveReason::Expired { .. })
    ));
    assert_eq!(h.identity.load(IdentityScope::Global).await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_poll_watchdog_notices_vanished_session() {
    let h = harness();
    h.directory.add_session(CODE, Duration::minutes(90)).await;
    h.controller.join(CODE, "Lærke").await.unwrap();

    // Teacher closes the session outright.
    h.directory.sessions.lock().await.clear();
    settle(700).await; // past one poll tick

    let snapshot = h.controller.snapshot().await;
    assert!(!snapshot.joined);
    assert!(matches!(
        snapshot.last_leave,
        Some(LeaveReason::Expired { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_hydrate_prefers_global_identity() {
    let h = harness();
    let global = StoredIdentity {
        session_code: CODE.to_string(),
        alias: "Lærke".to_string(),
    };
    let stale_activity = StoredIdentity {
        session_code: "ZZZZZZ".to_string(),
        alias: "Old".to_string(),
    };
    h.identity
        .save(IdentityScope::Activity, &stale_activity)
        .await
        .unwrap();
    h.identity
        .save(IdentityScope::Global, &global)
        .await
        .unwrap();

    let resolved = h.controller.hydrate().await.unwrap();
    assert_eq!(resolved, Some(global.clone()));
    // The global identity is re-persisted into the activity slot.
    assert_eq!(
        h.identity.load(IdentityScope::Activity).await.unwrap(),
        Some(global)
    );
    assert_eq!(h.controller.snapshot().await.phase, Phase::Identified);
}

#[tokio::test(start_paused = true)]
async fn test_auto_rejoin_fires_once_per_pair() {
    let h = harness();
    h.directory.add_session(CODE, Duration::minutes(90)).await;
    h.identity
        .save(
            IdentityScope::Global,
            &StoredIdentity {
                session_code: CODE.to_string(),
                alias: "Lærke".to_string(),
            },
        )
        .await
        .unwrap();

    h.controller.hydrate().await.unwrap();
    assert!(h.controller.auto_rejoin().await.unwrap());
    assert!(h.controller.snapshot().await.joined);

    // Forcing the controller back to Identified for the same pair must
    // not produce a second automatic join.
    h.controller.leave().await;
    h.identity
        .save(
            IdentityScope::Global,
            &StoredIdentity {
                session_code: CODE.to_string(),
                alias: "Lærke".to_string(),
            },
        )
        .await
        .unwrap();
    h.controller.hydrate().await.unwrap();
    let before = h.directory.join_calls.load(Ordering::SeqCst);
    assert!(!h.controller.auto_rejoin().await.unwrap());
    assert_eq!(h.directory.join_calls.load(Ordering::SeqCst), before);
}

#[tokio::test(start_paused = true)]
async fn test_auto_rejoin_clears_identity_on_terminal_rejection() {
    let h = harness();
    // No session rows: the persisted identity points nowhere.
    h.identity
        .save(
            IdentityScope::Global,
            &StoredIdentity {
                session_code: CODE.to_string(),
                alias: "Lærke".to_string(),
            },
        )
        .await
        .unwrap();

    h.controller.hydrate().await.unwrap();
    assert!(!h.controller.auto_rejoin().await.unwrap());

    assert_eq!(h.identity.load(IdentityScope::Global).await.unwrap(), None);
    assert_eq!(h.controller.snapshot().await.phase, Phase::Unidentified);
}

#[tokio::test(start_paused = true)]
async fn test_session_code_override_forces_reidentification() {
    let h = harness();
    h.directory.add_session(CODE, Duration::minutes(90)).await;
    h.controller.join(CODE, "Lærke").await.unwrap();

    h.controller.override_session_code("zz99zz").await;

    let snapshot = h.controller.snapshot().await;
    assert_eq!(snapshot.phase, Phase::Identified);
    assert_eq!(snapshot.session_code.as_deref(), Some("ZZ99ZZ"));
    assert!(!snapshot.joined);
}

#[tokio::test(start_paused = true)]
async fn test_live_flow_student_to_teacher() {
    // The end-to-end scenario: student joins, teacher observes the room,
    // a task event crosses, the teacher evicts.
    let h = harness();
    h.directory.add_session(CODE, Duration::minutes(90)).await;
    h.controller.join(CODE, "Lærke").await.unwrap();
    settle(10).await;

    let room = h.controller.snapshot().await.room.unwrap();
    assert_eq!(room.as_str(), "AB3F9Q:Lærke");

    let mut teacher = h.hub.subscribe(&room).await;
    h.hub
        .publish(
            &room,
            tavle_core::events::live::LiveEvent::Task {
                task: serde_json::json!({ "equation": "3 + 4" }),
                timestamp: Utc::now(),
            },
        )
        .await;

    match teacher.recv().await {
        Some(tavle_core::events::live::LiveEvent::Task { task, .. }) => {
            assert_eq!(task["equation"], "3 + 4");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    h.directory.evict(CODE, "Lærke", "Done for today").await.unwrap();
    settle(10).await;
    assert!(!h.controller.snapshot().await.joined);
}
