//! The set of live sessions.
//!
//! The registry is a plain map with no locking of its own.  It lives inside
//! [`SessionHub`](crate::application::hub::SessionHub), which guards it
//! together with the sync gate so that a toggle and a registration can never
//! interleave.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;
use voicecoding_core::{ServerMessage, SessionId, SessionInfo};

/// The session has been closed or its writer task has exited.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("session {0} is closed")]
pub struct SessionClosed(pub SessionId);

/// The sending half of one session's outbound queue.
///
/// Sending never blocks; the writer task drains the queue onto the socket.
/// Every clone shares one `closed` flag, so closing the session refuses
/// further sends even while the writer is still flushing what was queued.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    info: SessionInfo,
    outbound: mpsc::UnboundedSender<ServerMessage>,
    closed: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn new(info: SessionInfo, outbound: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            info,
            outbound,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> SessionId {
        self.info.id
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    /// Queues `msg` for this session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionClosed`] if the session was closed or the receiving
    /// end has been dropped.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SessionClosed> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionClosed(self.info.id));
        }
        self.outbound
            .send(msg)
            .map_err(|_| SessionClosed(self.info.id))
    }

    /// Refuses every later [`send`](Self::send) on this handle and its
    /// clones.  Messages already queued stay queued for the writer.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.outbound.is_closed()
    }
}

/// Live sessions keyed by id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session.  Returns `false` if the id was already present.
    pub fn register(&mut self, handle: SessionHandle) -> bool {
        let id = handle.id();
        if self.contains(id) {
            return false;
        }
        self.sessions.insert(id, handle);
        true
    }

    /// Removes a session.  Removing an absent id is a no-op returning `false`.
    pub fn unregister(&mut self, id: SessionId) -> bool {
        self.sessions.remove(&id).is_some()
    }

    /// Queues `msg` on every registered session.
    ///
    /// Sessions whose queue has closed are removed on the way.  Returns how
    /// many sessions accepted the message.
    pub fn broadcast(&mut self, msg: &ServerMessage) -> usize {
        let mut delivered = 0;
        self.sessions.retain(|id, handle| match handle.send(msg.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                debug!(session = %id, "dropping closed session during broadcast");
                false
            }
        });
        delivered
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Snapshot of the registered sessions' static info, oldest first.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> =
            self.sessions.values().map(|h| h.info().clone()).collect();
        infos.sort_by_key(|info| info.created_at);
        infos
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
