//! # voicecoding-core
//!
//! Shared library for VoiceCoding containing the relay protocol messages, the
//! JSON codec, and the small domain types (sync gate, session identity) that
//! both the desktop host and the phone-side client agree on.
//!
//! This crate has zero dependencies on sockets, async runtimes, or OS APIs.
//!
//! # Architecture overview (for beginners)
//!
//! VoiceCoding relays short text snippets from a phone to a desktop.  The
//! phone dictates text, sends it over a WebSocket on the local network, and
//! the desktop types it at the current cursor position.
//!
//! - **`protocol`** – What travels over the wire.  Every frame is a JSON
//!   object with a `type` field; the codec turns frames into typed Rust enums
//!   and back.  Non-JSON frames fall back to plain text for old clients.
//!
//! - **`domain`** – Pure state with no I/O: the global sync on/off gate and
//!   the identity and lifecycle phase of one client session.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `voicecoding_core::ClientMessage` instead of the full module path.
pub use domain::session::{SessionError, SessionId, SessionInfo, SessionPhase};
pub use domain::sync_state::SyncState;
pub use protocol::codec::{
    decode_message, decode_server_message, encode_message, encode_server_message, DecodeError,
    ProtocolError,
};
pub use protocol::messages::{ClientMessage, ServerMessage, UnknownKind, DEFAULT_PORT};
