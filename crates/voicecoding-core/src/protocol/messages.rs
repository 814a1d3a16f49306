//! All VoiceCoding relay protocol message types.
//!
//! Every frame on the wire is one JSON object with a `"type"` discriminant:
//!
//! ```json
//! {"type":"text","content":"hello world"}
//! {"type":"shadow_replace","deleteLength":3,"content":"abc"}
//! {"type":"pong","sync_enabled":true}
//! ```
//!
//! # Why two enums?
//!
//! The phone and the host send different things.  [`ClientMessage`] is what a
//! phone may send; [`ServerMessage`] is what the host sends back or pushes
//! unsolicited.  Keeping them apart makes it a compile-time error to reply to
//! a phone with a phone-only message.

use serde::{Deserialize, Serialize};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Well-known TCP port the host listens on.
pub const DEFAULT_PORT: u16 = 9527;

/// Wire names of the inbound message kinds.
pub mod kind {
    pub const TEXT: &str = "text";
    pub const SHADOW_FULL_SYNC: &str = "shadow_full_sync";
    pub const SHADOW_REPLACE: &str = "shadow_replace";
    pub const PING: &str = "ping";
}

// ── Phone → host ──────────────────────────────────────────────────────────────

/// A message kind string the host does not understand.
///
/// Only the codec can build one, from a frame whose `type` was not one of the
/// known kinds.  That keeps `decode(encode(m)) == m` true for every value a
/// caller is able to construct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnknownKind(String);

impl UnknownKind {
    pub(crate) fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    /// The raw `type` value received on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// All messages a phone can send to the host.
///
/// Optional fields mirror the wire: `None` means the field was absent, which
/// is distinct from `Some(String::new())`.  The difference matters for
/// [`ClientMessage::ShadowFullSync`], where an explicit empty string clears the
/// target surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Append `content` at the cursor and acknowledge.
    Text { content: Option<String> },

    /// Replace the whole target surface with `content`.  Never acknowledged.
    ShadowFullSync { content: Option<String> },

    /// Delete up to `delete_length` characters before the cursor, then append
    /// `content`.  Never acknowledged.
    ShadowReplace {
        delete_length: Option<u64>,
        content: Option<String>,
    },

    /// Keepalive; always answered with a `pong`.
    Ping,

    /// A well-formed frame whose `type` is not recognised.
    Unknown(UnknownKind),
}

impl ClientMessage {
    /// Builds a `text` message carrying `content`.
    pub fn text(content: impl Into<String>) -> Self {
        ClientMessage::Text {
            content: Some(content.into()),
        }
    }

    /// Builds a `shadow_full_sync` message carrying `content`.
    pub fn shadow_full_sync(content: impl Into<String>) -> Self {
        ClientMessage::ShadowFullSync {
            content: Some(content.into()),
        }
    }

    /// Builds a `shadow_replace` message.
    pub fn shadow_replace(delete_length: u64, content: impl Into<String>) -> Self {
        ClientMessage::ShadowReplace {
            delete_length: Some(delete_length),
            content: Some(content.into()),
        }
    }

    /// Returns the wire `type` of this message.
    ///
    /// Used in log lines instead of the message itself so dictated text never
    /// ends up in the logs.
    pub fn kind(&self) -> &str {
        match self {
            ClientMessage::Text { .. } => kind::TEXT,
            ClientMessage::ShadowFullSync { .. } => kind::SHADOW_FULL_SYNC,
            ClientMessage::ShadowReplace { .. } => kind::SHADOW_REPLACE,
            ClientMessage::Ping => kind::PING,
            ClientMessage::Unknown(k) => k.as_str(),
        }
    }
}

// ── Host → phone ──────────────────────────────────────────────────────────────

/// All messages the host sends to a phone.
///
/// # Serde representation
///
/// ```json
/// {"type":"connected","message":"Connected to Voice Coding server","sync_enabled":true,"host_name":"DESKTOP-01"}
/// {"type":"ack","message":"Text received and typed"}
/// {"type":"sync_state","sync_enabled":false}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Welcome, sent once right after the WebSocket handshake.
    Connected {
        message: String,
        sync_enabled: bool,
        host_name: String,
    },

    /// A `text` message was typed at the cursor.
    Ack { message: String },

    /// A `text` message arrived while the host has sync paused.
    SyncDisabled { message: String },

    /// Reply to `ping`, carrying the current sync flag.
    Pong { sync_enabled: bool },

    /// Broadcast to every phone when the host toggles sync.
    SyncState { sync_enabled: bool },

    /// A `text` message could not be typed because the OS automation failed.
    Error { message: String },
}

impl ServerMessage {
    /// Returns the wire `type` of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Connected { .. } => "connected",
            ServerMessage::Ack { .. } => "ack",
            ServerMessage::SyncDisabled { .. } => "sync_disabled",
            ServerMessage::Pong { .. } => "pong",
            ServerMessage::SyncState { .. } => "sync_state",
            ServerMessage::Error { .. } => "error",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
