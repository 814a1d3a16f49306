//! JSON codec for the VoiceCoding relay protocol.
//!
//! Wire format: one JSON object per WebSocket text frame.
//!
//! ```text
//! {"type": <kind>, "content": <string>?, "deleteLength": <u64>?}
//! ```
//!
//! Absent optional fields are omitted when encoding, never written as `null`.
//! A `null` value on input is read as absent.
//!
//! # Plain-text fallback
//!
//! The first phone builds sent bare strings instead of JSON.  Any payload that
//! is not a JSON object is therefore decoded as a `text` message whose content
//! is the raw payload, provided it is not blank.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::protocol::messages::{kind, ClientMessage, ServerMessage, UnknownKind};

/// Reasons an inbound frame could not become a [`ClientMessage`].
///
/// None of these are fatal to the session; the server logs and drops the
/// frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload is not JSON and contains only whitespace.
    #[error("empty payload")]
    Empty,

    /// The payload is a JSON object without a string `type` field.
    #[error("message has no string `type` field")]
    MissingKind,

    /// A known kind carried a field of the wrong JSON type.
    #[error("malformed `{kind}` message: {reason}")]
    Malformed { kind: String, reason: String },
}

/// Errors from the host→phone half of the codec.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// The frame is not a valid host message.
    #[error("failed to decode server message: {0}")]
    Decode(#[source] serde_json::Error),
}

const FIELD_CONTENT: &str = "content";
const FIELD_DELETE_LENGTH: &str = "deleteLength";

// ── Phone → host ──────────────────────────────────────────────────────────────

/// Decodes one inbound frame.
///
/// # Errors
///
/// Returns [`DecodeError`] when the frame is blank, lacks a `type`, or a known
/// kind carries a wrongly typed field.  Unrecognised kinds are **not** errors;
/// they decode to [`ClientMessage::Unknown`].
///
/// # Examples
///
/// ```rust
/// use voicecoding_core::{decode_message, ClientMessage};
///
/// let msg = decode_message(r#"{"type":"text","content":"hi"}"#).unwrap();
/// assert_eq!(msg, ClientMessage::text("hi"));
///
/// // Legacy clients send bare text.
/// let legacy = decode_message("hello there").unwrap();
/// assert_eq!(legacy, ClientMessage::text("hello there"));
/// ```
pub fn decode_message(raw: &str) -> Result<ClientMessage, DecodeError> {
    let object = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(object)) => object,
        // Not JSON, or JSON that is not an object: legacy plain text.
        _ => return plain_text(raw),
    };

    let msg_kind = match object.get("type") {
        Some(Value::String(k)) => k.as_str(),
        _ => return Err(DecodeError::MissingKind),
    };

    match msg_kind {
        kind::TEXT => Ok(ClientMessage::Text {
            content: optional_string(&object, msg_kind, FIELD_CONTENT)?,
        }),
        kind::SHADOW_FULL_SYNC => Ok(ClientMessage::ShadowFullSync {
            content: optional_string(&object, msg_kind, FIELD_CONTENT)?,
        }),
        kind::SHADOW_REPLACE => Ok(ClientMessage::ShadowReplace {
            delete_length: optional_length(&object, msg_kind, FIELD_DELETE_LENGTH)?,
            content: optional_string(&object, msg_kind, FIELD_CONTENT)?,
        }),
        kind::PING => Ok(ClientMessage::Ping),
        other => Ok(ClientMessage::Unknown(UnknownKind::new(other))),
    }
}

/// Encodes a phone message into its JSON frame.
///
/// This is the exact inverse of [`decode_message`] for every value a caller
/// can construct.
pub fn encode_message(msg: &ClientMessage) -> String {
    let mut object = Map::new();
    object.insert("type".to_string(), Value::String(msg.kind().to_string()));

    match msg {
        ClientMessage::Text { content } | ClientMessage::ShadowFullSync { content } => {
            insert_optional_string(&mut object, FIELD_CONTENT, content);
        }
        ClientMessage::ShadowReplace {
            delete_length,
            content,
        } => {
            if let Some(len) = delete_length {
                object.insert(FIELD_DELETE_LENGTH.to_string(), Value::from(*len));
            }
            insert_optional_string(&mut object, FIELD_CONTENT, content);
        }
        ClientMessage::Ping | ClientMessage::Unknown(_) => {}
    }

    Value::Object(object).to_string()
}

// ── Host → phone ──────────────────────────────────────────────────────────────

/// Encodes a host message into its JSON frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
pub fn encode_server_message(msg: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(ProtocolError::Encode)
}

/// Decodes a host message frame.  Used by phone-side clients.
///
/// # Errors
///
/// Returns [`ProtocolError::Decode`] for invalid JSON or an unknown `type`.
pub fn decode_server_message(raw: &str) -> Result<ServerMessage, ProtocolError> {
    serde_json::from_str(raw).map_err(ProtocolError::Decode)
}

// ── Field helpers ─────────────────────────────────────────────────────────────

fn plain_text(raw: &str) -> Result<ClientMessage, DecodeError> {
    if raw.trim().is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(ClientMessage::text(raw))
}

fn optional_string(
    object: &Map<String, Value>,
    kind: &str,
    field: &str,
) -> Result<Option<String>, DecodeError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(malformed(kind, format!("`{field}` must be a string"))),
    }
}

fn optional_length(
    object: &Map<String, Value>,
    kind: &str,
    field: &str,
) -> Result<Option<u64>, DecodeError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| malformed(kind, format!("`{field}` must be a non-negative integer"))),
        Some(_) => Err(malformed(kind, format!("`{field}` must be a number"))),
    }
}

fn insert_optional_string(object: &mut Map<String, Value>, field: &str, value: &Option<String>) {
    if let Some(s) = value {
        object.insert(field.to_string(), Value::String(s.clone()));
    }
}

fn malformed(kind: &str, reason: String) -> DecodeError {
    DecodeError::Malformed {
        kind: kind.to_string(),
        reason,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_with_content() {
        let msg = decode_message(r#"{"type":"text","content":"hello"}"#).unwrap();
        assert_eq!(msg, ClientMessage::text("hello"));
    }

    #[test]
    fn test_decode_text_without_content_is_absent_not_empty() {
        let msg = decode_message(r#"{"type":"text"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Text { content: None });
    }

    #[test]
    fn test_decode_null_content_reads_as_absent() {
        let msg = decode_message(r#"{"type":"shadow_full_sync","content":null}"#).unwrap();
        assert_eq!(msg, ClientMessage::ShadowFullSync { content: None });
    }

    #[test]
    fn test_decode_explicit_empty_content_is_kept() {
        let msg = decode_message(r#"{"type":"shadow_full_sync","content":""}"#).unwrap();
        assert_eq!(msg, ClientMessage::shadow_full_sync(""));
    }

    #[test]
    fn test_decode_shadow_replace_uses_camel_case_delete_length() {
        let msg =
            decode_message(r#"{"type":"shadow_replace","deleteLength":4,"content":"abc"}"#)
                .unwrap();
        assert_eq!(msg, ClientMessage::shadow_replace(4, "abc"));
    }

    #[test]
    fn test_decode_negative_delete_length_is_malformed() {
        let err =
            decode_message(r#"{"type":"shadow_replace","deleteLength":-3,"content":"x"}"#)
                .unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { ref kind, .. } if kind == "shadow_replace"));
    }

    #[test]
    fn test_decode_fractional_delete_length_is_malformed() {
        let err = decode_message(r#"{"type":"shadow_replace","deleteLength":2.5}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn test_decode_numeric_content_is_malformed() {
        let err = decode_message(r#"{"type":"text","content":5}"#).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Malformed {
                kind: "text".to_string(),
                reason: "`content` must be a string".to_string(),
            }
        );
    }

    #[test]
    fn test_decode_ping_ignores_extra_fields() {
        let msg = decode_message(r#"{"type":"ping","content":"ignored"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ping);
    }

    #[test]
    fn test_decode_unknown_kind_is_explicit_variant() {
        let msg = decode_message(r#"{"type":"voice_command","content":"undo"}"#).unwrap();
        match msg {
            ClientMessage::Unknown(k) => assert_eq!(k.as_str(), "voice_command"),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_object_without_type_is_missing_kind() {
        assert_eq!(
            decode_message(r#"{"content":"hi"}"#),
            Err(DecodeError::MissingKind)
        );
    }

    #[test]
    fn test_decode_non_string_type_is_missing_kind() {
        assert_eq!(
            decode_message(r#"{"type":7}"#),
            Err(DecodeError::MissingKind)
        );
    }

    #[test]
    fn test_decode_plain_text_falls_back_to_text() {
        let msg = decode_message("print('hi')").unwrap();
        assert_eq!(msg, ClientMessage::text("print('hi')"));
    }

    #[test]
    fn test_decode_plain_text_keeps_surrounding_whitespace() {
        let msg = decode_message("  indented\n").unwrap();
        assert_eq!(msg, ClientMessage::text("  indented\n"));
    }

    #[test]
    fn test_decode_json_scalar_falls_back_to_text() {
        let msg = decode_message("42").unwrap();
        assert_eq!(msg, ClientMessage::text("42"));
    }

    #[test]
    fn test_decode_truncated_json_falls_back_to_text() {
        let raw = r#"{"type":"text","content":"hel"#;
        assert_eq!(decode_message(raw).unwrap(), ClientMessage::text(raw));
    }

    #[test]
    fn test_decode_blank_payload_is_empty_error() {
        assert_eq!(decode_message(""), Err(DecodeError::Empty));
        assert_eq!(decode_message(" \t\r\n"), Err(DecodeError::Empty));
    }

    #[test]
    fn test_encode_omits_absent_fields() {
        let json = encode_message(&ClientMessage::Text { content: None });
        assert_eq!(json, r#"{"type":"text"}"#);
    }

    #[test]
    fn test_encode_keeps_explicit_empty_content() {
        let json = encode_message(&ClientMessage::shadow_full_sync(""));
        assert!(json.contains(r#""content":"""#));
    }

    #[test]
    fn test_encode_shadow_replace_writes_delete_length() {
        let json = encode_message(&ClientMessage::shadow_replace(12, "z"));
        assert!(json.contains(r#""deleteLength":12"#));
        assert!(json.contains(r#""type":"shadow_replace""#));
    }

    #[test]
    fn test_unknown_kind_survives_encode_decode() {
        let decoded = decode_message(r#"{"type":"future_kind"}"#).unwrap();
        assert_eq!(decode_message(&encode_message(&decoded)).unwrap(), decoded);
    }

    #[test]
    fn test_server_message_round_trips() {
        let msg = ServerMessage::Pong { sync_enabled: false };
        let json = encode_server_message(&msg).unwrap();
        assert_eq!(decode_server_message(&json).unwrap(), msg);
    }

    #[test]
    fn test_decode_server_message_rejects_garbage() {
        assert!(matches!(
            decode_server_message("not json"),
            Err(ProtocolError::Decode(_))
        ));
    }
}
