//! One connected phone.
//!
//! A [`Session`] owns its lifecycle phase and the receiving end of its send
//! queue.  The sending end is a cloneable [`SessionHandle`] that lives in the
//! registry, so direct replies and broadcasts share one FIFO queue and reach
//! the phone in the order they were enqueued.

use std::net::SocketAddr;

use tokio::sync::mpsc;
use voicecoding_core::{ServerMessage, SessionError, SessionId, SessionInfo, SessionPhase};

use crate::application::registry::SessionHandle;

pub struct Session {
    info: SessionInfo,
    phase: SessionPhase,
    handle: SessionHandle,
    outbound: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Session {
    /// Creates a session in the `Connecting` phase with an empty send queue.
    pub fn new(remote_addr: SocketAddr) -> Self {
        let info = SessionInfo::new(remote_addr);
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            handle: SessionHandle::new(info.clone(), tx),
            info,
            phase: SessionPhase::Connecting,
            outbound: rx,
        }
    }

    pub fn id(&self) -> SessionId {
        self.info.id
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// A sender for this session's queue, suitable for the registry.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Marks the handshake as complete.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless the session is
    /// still `Connecting`.
    pub fn open(&mut self) -> Result<(), SessionError> {
        self.phase = self.phase.open()?;
        Ok(())
    }

    /// Moves to `Closed` and stops accepting queued messages.
    ///
    /// Every handle is refused from here on, including after
    /// [`take_outbound`](Self::take_outbound) has moved the queue to the
    /// writer.  Messages queued before the close are still delivered.
    ///
    /// Returns `true` only for the call that actually closed the session.
    pub fn close(&mut self) -> bool {
        let was_closed = self.phase == SessionPhase::Closed;
        self.phase = self.phase.close();
        self.handle.close();
        !was_closed
    }

    /// Splits off the receiving end of the send queue for the writer task.
    ///
    /// The session keeps its identity, phase and close control; only the
    /// queue moves.  The queue ends once the session is closed and every
    /// handle has been dropped.
    pub fn take_outbound(&mut self) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (_, empty) = mpsc::unbounded_channel();
        std::mem::replace(&mut self.outbound, empty)
    }
}
