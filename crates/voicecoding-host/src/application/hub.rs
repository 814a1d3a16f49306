//! Shared host state: the sync gate plus the session registry.
//!
//! Both live under a single mutex.  Holding one lock for both is what makes
//! the two ordering guarantees hold:
//!
//! - A session registered before a toggle receives the `sync_state`
//!   broadcast; one registered after it does not, but its welcome already
//!   carries the new value.
//! - A session's welcome is queued before it can receive any broadcast.
//!
//! The lock is a `std::sync::Mutex` because nothing awaits while holding it;
//! every operation is a map update plus non-blocking queue sends.
//!
//! Status changes (sync flag, client count) are published on a
//! `tokio::sync::watch` channel for the console and any other observer.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::info;
use voicecoding_core::{ServerMessage, SessionId, SessionInfo, SyncState};

use crate::application::registry::{SessionClosed, SessionHandle, SessionRegistry};

/// Snapshot published to observers whenever the sync flag or client count
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostStatus {
    pub sync_enabled: bool,
    pub clients: usize,
}

#[derive(Debug)]
struct HubState {
    sync: SyncState,
    registry: SessionRegistry,
}

impl HubState {
    fn status(&self) -> HostStatus {
        HostStatus {
            sync_enabled: self.sync.is_enabled(),
            clients: self.registry.count(),
        }
    }
}

/// Process-wide shared state, held in an `Arc` by every session task.
#[derive(Debug)]
pub struct SessionHub {
    state: Mutex<HubState>,
    status_tx: watch::Sender<HostStatus>,
}

impl SessionHub {
    pub fn new(sync_enabled: bool) -> Self {
        let state = HubState {
            sync: SyncState::new(sync_enabled),
            registry: SessionRegistry::new(),
        };
        let (status_tx, _) = watch::channel(state.status());
        Self {
            state: Mutex::new(state),
            status_tx,
        }
    }

    // A panic while holding the lock leaves the map and flag consistent
    // (every mutation is a single call), so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &HubState) {
        self.status_tx.send_replace(state.status());
    }

    // ── Sync gate ────────────────────────────────────────────────────────────

    pub fn is_enabled(&self) -> bool {
        self.lock().sync.is_enabled()
    }

    /// Flips the sync flag, broadcasts `sync_state` to every registered
    /// session and returns the new value.
    pub fn toggle(&self) -> bool {
        let mut state = self.lock();
        let enabled = state.sync.toggle();
        self.announce(&mut state, enabled);
        enabled
    }

    /// Sets the sync flag.  Broadcasts only if the value changed.
    ///
    /// Returns `true` if the value changed.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        let mut state = self.lock();
        let changed = state.sync.set(enabled);
        if changed {
            self.announce(&mut state, enabled);
        }
        changed
    }

    fn announce(&self, state: &mut HubState, enabled: bool) {
        let delivered = state.registry.broadcast(&ServerMessage::SyncState {
            sync_enabled: enabled,
        });
        info!(sync_enabled = enabled, delivered, "sync state changed");
        self.publish(state);
    }

    // ── Sessions ─────────────────────────────────────────────────────────────

    /// Queues the welcome built by `greeting` and registers the session, as
    /// one step.
    ///
    /// `greeting` receives the sync flag as of registration.
    ///
    /// # Errors
    ///
    /// Returns [`SessionClosed`] if the welcome could not be queued; the
    /// session is then not registered.
    pub fn register<F>(&self, handle: SessionHandle, greeting: F) -> Result<(), SessionClosed>
    where
        F: FnOnce(bool) -> ServerMessage,
    {
        let mut state = self.lock();
        handle.send(greeting(state.sync.is_enabled()))?;
        if state.registry.register(handle) {
            self.publish(&state);
        }
        Ok(())
    }

    /// Removes a session.  Safe to call more than once.
    pub fn unregister(&self, id: SessionId) -> bool {
        let mut state = self.lock();
        let removed = state.registry.unregister(id);
        if removed {
            self.publish(&state);
        }
        removed
    }

    /// Queues `msg` on every registered session and returns how many accepted
    /// it.  Dead sessions are dropped.
    pub fn broadcast(&self, msg: &ServerMessage) -> usize {
        let mut state = self.lock();
        let before = state.registry.count();
        let delivered = state.registry.broadcast(msg);
        if state.registry.count() != before {
            self.publish(&state);
        }
        delivered
    }

    pub fn count(&self) -> usize {
        self.lock().registry.count()
    }

    /// Snapshot of the connected phones, oldest first.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.lock().registry.sessions()
    }

    // ── Observation ──────────────────────────────────────────────────────────

    pub fn status(&self) -> HostStatus {
        self.lock().status()
    }

    /// Returns a receiver that sees every published [`HostStatus`].
    pub fn subscribe(&self) -> watch::Receiver<HostStatus> {
        self.status_tx.subscribe()
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new(true)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
