//! Watcher tasks armed while the controller is joined.
//!
//! Four independent, cancellable watchers feed the one `force_leave`
//! entry point: the heartbeat (guaranteed but slow eviction detection),
//! the exact expiry timer, the poll watchdog (session re-validation),
//! and the push subscriber (fast but best-effort eviction). The
//! redundancy between push and heartbeat is deliberate; either signal
//! alone is sufficient cause to leave.
//!
//! Every task holds only a weak reference to the controller and exits
//! on cancellation, so a superseded identity can never receive a stale
//! write.

use std::sync::{Arc, Weak};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tavle_core::events::live::LiveEvent;
use tavle_core::traits::bus::EventBus;
use tavle_core::traits::directory::{JoinGrant, SessionDirectory, TouchOutcome};

use super::machine::LifecycleController;
use super::state::LeaveReason;

/// The cancellation token and task handles for one joined generation.
pub(crate) struct WatcherSet {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl WatcherSet {
    /// Cancel every watcher. Tasks exit at their next await point.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Drop for WatcherSet {
    fn drop(&mut self) {
        // Cancel only; never abort. A watcher may be dropping this set
        // from inside its own force-leave call, and an abort would cut
        // that cleanup short. Every task exits at its next await once
        // the token is cancelled.
        self.token.cancel();
    }
}

impl std::fmt::Debug for WatcherSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherSet")
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

/// Arm all watchers for a freshly joined grant.
pub(crate) fn arm(
    controller: &LifecycleController,
    grant: &JoinGrant,
    generation: u64,
) -> WatcherSet {
    let token = CancellationToken::new();
    let mut tasks = Vec::with_capacity(4);

    tasks.push(spawn_heartbeat(controller, grant, generation, &token));
    tasks.push(spawn_expiry_timer(controller, grant, generation, &token));
    tasks.push(spawn_poll_watchdog(controller, grant, generation, &token));
    if let Some(bus) = controller.push.clone() {
        tasks.push(spawn_push_watcher(bus, controller, grant, generation, &token));
    }

    WatcherSet { token, tasks }
}

async fn leave(weak: &Weak<LifecycleController>, generation: u64, reason: LeaveReason) {
    if let Some(controller) = weak.upgrade() {
        controller.force_leave(generation, reason).await;
    }
}

/// Heartbeat: touch the participant row on a fixed interval. A missed
/// heartbeat is swallowed and retried on the next tick; only a confirmed
/// `Removed` evicts.
fn spawn_heartbeat(
    controller: &LifecycleController,
    grant: &JoinGrant,
    generation: u64,
    token: &CancellationToken,
) -> JoinHandle<()> {
    let directory = Arc::clone(&controller.directory);
    let weak = controller.weak.clone();
    let token = token.clone();
    let period = controller.config.heartbeat_interval;
    let code = grant.code.clone();
    let alias = grant.alias.clone();

    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    match directory.touch(&code, &alias).await {
                        Ok(TouchOutcome::Alive) => {}
                        Ok(TouchOutcome::Removed) => {
                            leave(&weak, generation, LeaveReason::Evicted {
                                message: "You were removed from the session".to_string(),
                            })
                            .await;
                            break;
                        }
                        Err(e) => {
                            debug!(error = %e, "Heartbeat failed, retrying on next tick");
                        }
                    }
                }
            }
        }
    })
}

/// Exact expiry timer. The delay is recomputed from `expires_at - now`
/// at arm time; a non-positive delay means already expired, leave
/// immediately.
fn spawn_expiry_timer(
    controller: &LifecycleController,
    grant: &JoinGrant,
    generation: u64,
    token: &CancellationToken,
) -> JoinHandle<()> {
    let weak = controller.weak.clone();
    let token = token.clone();
    let expires_at = grant.expires_at;

    tokio::spawn(async move {
        let delay = (expires_at - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(delay) => {
                leave(&weak, generation, LeaveReason::Expired {
                    message: "Session has expired".to_string(),
                })
                .await;
            }
        }
    })
}

/// Poll watchdog: re-validate the session row on a fixed interval. An
/// absent or expired session forces the leave even if the expiry timer
/// was armed against stale data.
fn spawn_poll_watchdog(
    controller: &LifecycleController,
    grant: &JoinGrant,
    generation: u64,
    token: &CancellationToken,
) -> JoinHandle<()> {
    let directory = Arc::clone(&controller.directory);
    let weak = controller.weak.clone();
    let token = token.clone();
    let period = controller.config.poll_interval;
    let code = grant.code.clone();

    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    match directory.lookup_session(&code).await {
                        Ok(Some(_)) => {}
                        Ok(None) => {
                            leave(&weak, generation, LeaveReason::Expired {
                                message: "Session has ended".to_string(),
                            })
                            .await;
                            break;
                        }
                        Err(e) => {
                            debug!(error = %e, "Session poll failed, retrying on next tick");
                        }
                    }
                }
            }
        }
    })
}

/// Push eviction: subscribe to the room and leave the moment a kick
/// arrives. Fast but best-effort; the heartbeat covers missed pushes.
fn spawn_push_watcher(
    bus: Arc<dyn EventBus>,
    controller: &LifecycleController,
    grant: &JoinGrant,
    generation: u64,
    token: &CancellationToken,
) -> JoinHandle<()> {
    let weak = controller.weak.clone();
    let token = token.clone();
    let room = grant.room.clone();

    tokio::spawn(async move {
        let mut subscription = bus.subscribe(&room).await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                event = subscription.recv() => match event {
                    Some(LiveEvent::Kick { reason, .. }) => {
                        leave(&weak, generation, LeaveReason::Evicted { message: reason }).await;
                        break;
                    }
                    Some(_) => {}
                    None => break,
                },
            }
        }
    })
}
