//! Session identity and lifecycle.
//!
//! A session is one live WebSocket connection from a phone.  Sessions are
//! never persisted; a host restart forgets them all.
//!
//! # Lifecycle
//!
//! ```text
//! Connecting ──► Open ──► Closed
//!      │                    ▲
//!      └────────────────────┘   (handshake failed)
//! ```
//!
//! `Closed` is terminal.

use std::fmt;
use std::net::SocketAddr;
use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

/// Opaque handle identifying one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The first group is enough to tell sessions apart in log lines.
        let full = self.0.to_string();
        f.write_str(&full[..8])
    }
}

/// Static facts about a session, fixed when the connection is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub remote_addr: SocketAddr,
    pub created_at: SystemTime,
}

impl SessionInfo {
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            id: SessionId::new(),
            remote_addr,
            created_at: SystemTime::now(),
        }
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// TCP accepted, WebSocket handshake not yet complete.
    Connecting,
    /// Handshake done; messages flow.
    Open,
    /// Read side ended or a send failed.  Nothing more is sent.
    Closed,
}

/// Invalid lifecycle transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot move session from {from:?} to {to:?}")]
    InvalidTransition { from: SessionPhase, to: SessionPhase },
}

impl SessionPhase {
    /// `Connecting → Open`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] from any other phase.
    pub fn open(self) -> Result<Self, SessionError> {
        match self {
            SessionPhase::Connecting => Ok(SessionPhase::Open),
            from => Err(SessionError::InvalidTransition {
                from,
                to: SessionPhase::Open,
            }),
        }
    }

    /// Any phase `→ Closed`.  Closing twice is allowed and stays closed.
    pub fn close(self) -> Self {
        SessionPhase::Closed
    }

    pub fn is_open(self) -> bool {
        self == SessionPhase::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_session_id_display_is_short_prefix() {
        let id = SessionId::new();
        let shown = id.to_string();
        assert_eq!(shown.len(), 8);
        assert!(id.as_uuid().to_string().starts_with(&shown));
    }

    #[test]
    fn test_session_info_records_remote_addr() {
        let addr: SocketAddr = "192.168.43.12:50123".parse().unwrap();
        let info = SessionInfo::new(addr);
        assert_eq!(info.remote_addr, addr);
        assert!(info.created_at <= SystemTime::now());
    }

    #[test]
    fn test_phase_connecting_opens() {
        assert_eq!(SessionPhase::Connecting.open(), Ok(SessionPhase::Open));
    }

    #[test]
    fn test_phase_closed_cannot_reopen() {
        assert_eq!(
            SessionPhase::Closed.open(),
            Err(SessionError::InvalidTransition {
                from: SessionPhase::Closed,
                to: SessionPhase::Open,
            })
        );
    }

    #[test]
    fn test_phase_open_cannot_open_again() {
        assert!(SessionPhase::Open.open().is_err());
    }

    #[test]
    fn test_phase_close_is_idempotent() {
        let closed = SessionPhase::Open.close();
        assert_eq!(closed.close(), SessionPhase::Closed);
        assert!(!closed.is_open());
    }
}
