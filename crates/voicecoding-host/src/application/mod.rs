//! Application layer for voicecoding-host.
//!
//! Knows *what* happens to each phone message but not *how* bytes reach the
//! phone or how keystrokes reach the OS.
//!
//! # Responsibilities
//!
//! - Session lifecycle and per-session send queues
//! - The registry of live sessions and best-effort broadcast
//! - The global sync gate and its change notifications
//! - The injection policy: append, full replace, bounded partial replace
//!
//! # What does NOT belong here?
//!
//! - Sockets and WebSocket framing (infrastructure)
//! - Clipboard or keystroke automation (infrastructure, behind [`TextSurface`])

pub mod hub;
pub mod injection;
pub mod registry;
pub mod session;

pub use hub::{HostStatus, SessionHub};
pub use injection::{
    clamp_delete_length, InjectionError, InjectionPolicy, TextSurface, ACK_MESSAGE,
    MAX_DELETE_PER_REPLACE, SYNC_DISABLED_MESSAGE,
};
pub use registry::{SessionClosed, SessionHandle, SessionRegistry};
pub use session::Session;
