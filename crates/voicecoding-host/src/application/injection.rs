//! InjectionPolicy: decides how each phone message changes the desktop text.
//!
//! This use case sits at the application layer and delegates the actual
//! keystrokes to a [`TextSurface`] trait object.  Concrete surfaces (clipboard
//! paste, in-memory buffer) live in the infrastructure layer.
//!
//! # Policy per message kind
//!
//! | kind               | sync on                              | sync off        |
//! |--------------------|--------------------------------------|-----------------|
//! | `text`             | append at cursor, reply `ack`        | `sync_disabled` |
//! | `shadow_full_sync` | select-all and replace, no reply     | no-op           |
//! | `shadow_replace`   | delete ≤ 100 before cursor, append   | no-op           |
//! | `ping`             | `pong`                               | `pong`          |
//!
//! Empty `text` content is "nothing to do".  Empty `shadow_full_sync` content
//! is a real clear and is executed.
//!
//! # Serialisation
//!
//! Every surface call happens under one process-wide injection lock, so two
//! sessions' text never interleaves on screen.  The sync flag is read from
//! the hub *before* the injection lock is taken; the hub lock is never held
//! while a surface call blocks.
//!
//! All entry points are synchronous and may block for the clipboard-settle
//! delay.  The server loop calls them from `spawn_blocking`.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, error, warn};
use voicecoding_core::{ClientMessage, ServerMessage};

use crate::application::hub::SessionHub;

/// Upper bound on characters removed by one `shadow_replace`.
pub const MAX_DELETE_PER_REPLACE: usize = 100;

/// Text of the `ack` reply to a typed `text` message.
pub const ACK_MESSAGE: &str = "Text received and typed";

/// Text of the reply to `text` while sync is paused.
pub const SYNC_DISABLED_MESSAGE: &str = "Sync is paused on the host";

/// Error type for text-surface operations.
#[derive(Debug, Error)]
pub enum InjectionError {
    #[error("clipboard error: {0}")]
    Clipboard(String),
    #[error("key automation failed: {0}")]
    Keys(String),
    #[error("platform error: {0}")]
    Platform(String),
}

/// The OS text-input focus, as an opaque capability.
///
/// Implementations may block briefly but must not hang.
#[cfg_attr(test, mockall::automock)]
pub trait TextSurface: Send + Sync {
    /// Types `text` at the current cursor position without disturbing
    /// existing content.
    fn insert_at_cursor(&self, text: &str) -> Result<(), InjectionError>;

    /// Selects everything in the focused field and replaces it with `text`.
    /// An empty `text` clears the field.
    fn replace_all(&self, text: &str) -> Result<(), InjectionError>;

    /// Removes `count` characters immediately before the cursor.
    fn delete_before_cursor(&self, count: usize) -> Result<(), InjectionError>;
}

/// Clamps a wire `deleteLength` to [`MAX_DELETE_PER_REPLACE`].
pub fn clamp_delete_length(requested: u64) -> usize {
    usize::try_from(requested)
        .unwrap_or(usize::MAX)
        .min(MAX_DELETE_PER_REPLACE)
}

/// Applies phone messages to a [`TextSurface`], gated by the hub's sync flag.
pub struct InjectionPolicy {
    surface: Arc<dyn TextSurface>,
    hub: Arc<SessionHub>,
    injection_lock: Mutex<()>,
}

impl InjectionPolicy {
    pub fn new(surface: Arc<dyn TextSurface>, hub: Arc<SessionHub>) -> Self {
        Self {
            surface,
            hub,
            injection_lock: Mutex::new(()),
        }
    }

    /// Dispatches one decoded message and returns the reply to send, if any.
    pub fn handle(&self, msg: &ClientMessage) -> Option<ServerMessage> {
        match msg {
            ClientMessage::Text { content } => self.text(content.as_deref()),
            ClientMessage::ShadowFullSync { content } => {
                if let Err(e) = self.shadow_full_sync(content.as_deref()) {
                    error!(error = %e, "shadow_full_sync injection failed");
                }
                None
            }
            ClientMessage::ShadowReplace {
                delete_length,
                content,
            } => {
                let delete = delete_length.unwrap_or(0);
                if let Err(e) = self.shadow_replace(delete, content.as_deref().unwrap_or("")) {
                    error!(error = %e, "shadow_replace injection failed");
                }
                None
            }
            ClientMessage::Ping => Some(self.ping()),
            ClientMessage::Unknown(kind) => {
                warn!(kind = kind.as_str(), "ignoring unknown message kind");
                None
            }
        }
    }

    /// Appends `content` at the cursor.
    ///
    /// Returns `ack` on success, `error` if the surface failed,
    /// `sync_disabled` while paused, and nothing for empty content.
    pub fn text(&self, content: Option<&str>) -> Option<ServerMessage> {
        if !self.hub.is_enabled() {
            debug!("text received while sync is disabled");
            return Some(ServerMessage::SyncDisabled {
                message: SYNC_DISABLED_MESSAGE.to_string(),
            });
        }

        let content = match content {
            Some(c) if !c.is_empty() => c,
            _ => {
                debug!("empty text message, nothing to type");
                return None;
            }
        };

        let _guard = self.lock();
        match self.surface.insert_at_cursor(content) {
            Ok(()) => {
                debug!(chars = content.chars().count(), "typed text");
                Some(ServerMessage::Ack {
                    message: ACK_MESSAGE.to_string(),
                })
            }
            Err(e) => {
                error!(error = %e, "text injection failed");
                Some(ServerMessage::Error {
                    message: e.to_string(),
                })
            }
        }
    }

    /// Replaces the whole focused field with `content`.
    ///
    /// Absent content is ignored; `Some("")` clears the field.
    ///
    /// # Errors
    ///
    /// Propagates the surface's [`InjectionError`].
    pub fn shadow_full_sync(&self, content: Option<&str>) -> Result<(), InjectionError> {
        if !self.hub.is_enabled() {
            debug!("shadow_full_sync ignored while sync is disabled");
            return Ok(());
        }
        let Some(content) = content else {
            warn!("shadow_full_sync without content ignored");
            return Ok(());
        };

        let _guard = self.lock();
        self.surface.replace_all(content)?;
        debug!(chars = content.chars().count(), "replaced full text");
        Ok(())
    }

    /// Deletes up to [`MAX_DELETE_PER_REPLACE`] characters before the cursor,
    /// then appends `content`.  Both steps run under one lock acquisition.
    ///
    /// # Errors
    ///
    /// Propagates the surface's [`InjectionError`]; if the delete fails the
    /// insert is not attempted.
    pub fn shadow_replace(&self, delete_length: u64, content: &str) -> Result<(), InjectionError> {
        if !self.hub.is_enabled() {
            debug!("shadow_replace ignored while sync is disabled");
            return Ok(());
        }

        let delete = clamp_delete_length(delete_length);
        if (delete as u64) < delete_length {
            debug!(requested = delete_length, clamped = delete, "clamped deleteLength");
        }

        let _guard = self.lock();
        if delete > 0 {
            self.surface.delete_before_cursor(delete)?;
        }
        if !content.is_empty() {
            self.surface.insert_at_cursor(content)?;
        }
        debug!(deleted = delete, chars = content.chars().count(), "applied partial replace");
        Ok(())
    }

    /// Always answers with the current sync flag.
    pub fn ping(&self) -> ServerMessage {
        ServerMessage::Pong {
            sync_enabled: self.hub.is_enabled(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.injection_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use std::thread;
    use std::time::Duration;

    /// Minimal in-test surface: a string buffer with the cursor at its end.
    #[derive(Default)]
    struct BufferSurface {
        text: Mutex<String>,
        /// When set, `insert_at_cursor` types one char at a time with a pause
        /// so an unserialised caller would interleave.
        char_delay: Option<Duration>,
    }

    impl BufferSurface {
        fn with_text(text: &str) -> Self {
            Self {
                text: Mutex::new(text.to_string()),
                char_delay: None,
            }
        }

        fn contents(&self) -> String {
            self.text.lock().unwrap().clone()
        }
    }

    impl TextSurface for BufferSurface {
        fn insert_at_cursor(&self, text: &str) -> Result<(), InjectionError> {
            match self.char_delay {
                Some(delay) => {
                    for ch in text.chars() {
                        self.text.lock().unwrap().push(ch);
                        thread::sleep(delay);
                    }
                }
                None => self.text.lock().unwrap().push_str(text),
            }
            Ok(())
        }

        fn replace_all(&self, text: &str) -> Result<(), InjectionError> {
            *self.text.lock().unwrap() = text.to_string();
            Ok(())
        }

        fn delete_before_cursor(&self, count: usize) -> Result<(), InjectionError> {
            let mut buf = self.text.lock().unwrap();
            for _ in 0..count {
                if buf.pop().is_none() {
                    break;
                }
            }
            Ok(())
        }
    }

    fn policy_with(surface: Arc<dyn TextSurface>, sync_enabled: bool) -> InjectionPolicy {
        InjectionPolicy::new(surface, Arc::new(SessionHub::new(sync_enabled)))
    }

    fn ack() -> ServerMessage {
        ServerMessage::Ack {
            message: ACK_MESSAGE.to_string(),
        }
    }

    // ── clamp ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_clamp_delete_length_bounds() {
        assert_eq!(clamp_delete_length(0), 0);
        assert_eq!(clamp_delete_length(7), 7);
        assert_eq!(clamp_delete_length(100), 100);
        assert_eq!(clamp_delete_length(500), 100);
        assert_eq!(clamp_delete_length(u64::MAX), 100);
    }

    // ── text ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_text_appends_and_acks() {
        // Arrange
        let surface = Arc::new(BufferSurface::with_text("prior "));
        let policy = policy_with(surface.clone(), true);

        // Act
        let reply = policy.handle(&ClientMessage::text("hi"));

        // Assert
        assert_eq!(reply, Some(ack()));
        assert_eq!(surface.contents(), "prior hi");
    }

    #[test]
    fn test_text_while_disabled_replies_sync_disabled_and_leaves_surface() {
        let surface = Arc::new(BufferSurface::with_text("keep"));
        let policy = policy_with(surface.clone(), false);

        let reply = policy.handle(&ClientMessage::text("hi"));

        assert!(matches!(reply, Some(ServerMessage::SyncDisabled { .. })));
        assert_eq!(surface.contents(), "keep");
    }

    #[test]
    fn test_empty_text_is_nothing_to_do() {
        let mut mock = MockTextSurface::new();
        mock.expect_insert_at_cursor().never();
        let policy = policy_with(Arc::new(mock), true);

        assert_eq!(policy.text(Some("")), None);
        assert_eq!(policy.text(None), None);
    }

    #[test]
    fn test_empty_text_while_disabled_still_reports_disabled() {
        let policy = policy_with(Arc::new(MockTextSurface::new()), false);
        assert!(matches!(
            policy.text(Some("")),
            Some(ServerMessage::SyncDisabled { .. })
        ));
    }

    #[test]
    fn test_text_surface_failure_replies_error() {
        // Arrange
        let mut mock = MockTextSurface::new();
        mock.expect_insert_at_cursor()
            .with(eq("hello"))
            .times(1)
            .returning(|_| Err(InjectionError::Platform("cannot open X display".to_string())));
        let policy = policy_with(Arc::new(mock), true);

        // Act
        let reply = policy.text(Some("hello"));

        // Assert
        match reply {
            Some(ServerMessage::Error { message }) => assert!(message.contains("X display")),
            other => panic!("expected error reply, got {other:?}"),
        }
    }

    // ── shadow_full_sync ─────────────────────────────────────────────────────

    #[test]
    fn test_full_sync_empty_clears_without_reply() {
        let surface = Arc::new(BufferSurface::with_text("old content"));
        let policy = policy_with(surface.clone(), true);

        let reply = policy.handle(&ClientMessage::shadow_full_sync(""));

        assert_eq!(reply, None);
        assert_eq!(surface.contents(), "");
    }

    #[test]
    fn test_full_sync_replaces_content() {
        let surface = Arc::new(BufferSurface::with_text("old"));
        let policy = policy_with(surface.clone(), true);

        policy.shadow_full_sync(Some("new text")).unwrap();

        assert_eq!(surface.contents(), "new text");
    }

    #[test]
    fn test_full_sync_absent_content_is_ignored() {
        let mut mock = MockTextSurface::new();
        mock.expect_replace_all().never();
        let policy = policy_with(Arc::new(mock), true);

        let reply = policy.handle(&ClientMessage::ShadowFullSync { content: None });

        assert_eq!(reply, None);
    }

    #[test]
    fn test_full_sync_disabled_is_noop() {
        let mut mock = MockTextSurface::new();
        mock.expect_replace_all().never();
        let policy = policy_with(Arc::new(mock), false);

        assert!(policy.shadow_full_sync(Some("")).is_ok());
    }

    // ── shadow_replace ───────────────────────────────────────────────────────

    #[test]
    fn test_shadow_replace_deletes_then_appends() {
        let surface = Arc::new(BufferSurface::with_text("hello wrld"));
        let policy = policy_with(surface.clone(), true);

        let reply = policy.handle(&ClientMessage::shadow_replace(4, "world"));

        assert_eq!(reply, None);
        assert_eq!(surface.contents(), "hello world");
    }

    #[test]
    fn test_shadow_replace_clamps_to_100() {
        // Arrange
        let mut mock = MockTextSurface::new();
        mock.expect_delete_before_cursor()
            .with(eq(MAX_DELETE_PER_REPLACE))
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_insert_at_cursor()
            .with(eq("x"))
            .times(1)
            .returning(|_| Ok(()));
        let policy = policy_with(Arc::new(mock), true);

        // Act / Assert
        assert!(policy.shadow_replace(500, "x").is_ok());
    }

    #[test]
    fn test_shadow_replace_skips_zero_length_steps() {
        let mut mock = MockTextSurface::new();
        mock.expect_delete_before_cursor().never();
        mock.expect_insert_at_cursor().never();
        let policy = policy_with(Arc::new(mock), true);

        let reply = policy.handle(&ClientMessage::ShadowReplace {
            delete_length: None,
            content: None,
        });

        assert_eq!(reply, None);
    }

    #[test]
    fn test_shadow_replace_delete_failure_skips_insert() {
        let mut mock = MockTextSurface::new();
        mock.expect_delete_before_cursor()
            .returning(|_| Err(InjectionError::Platform("no display".to_string())));
        mock.expect_insert_at_cursor().never();
        let policy = policy_with(Arc::new(mock), true);

        assert!(policy.shadow_replace(3, "abc").is_err());
    }

    #[test]
    fn test_shadow_replace_disabled_is_noop() {
        let surface = Arc::new(BufferSurface::with_text("abc"));
        let policy = policy_with(surface.clone(), false);

        policy.shadow_replace(3, "xyz").unwrap();

        assert_eq!(surface.contents(), "abc");
    }

    // ── ping / unknown ───────────────────────────────────────────────────────

    #[test]
    fn test_ping_reports_flag_in_both_states() {
        let hub = Arc::new(SessionHub::new(true));
        let policy = InjectionPolicy::new(Arc::new(MockTextSurface::new()), Arc::clone(&hub));

        assert_eq!(
            policy.handle(&ClientMessage::Ping),
            Some(ServerMessage::Pong { sync_enabled: true })
        );

        hub.toggle();

        assert_eq!(
            policy.handle(&ClientMessage::Ping),
            Some(ServerMessage::Pong {
                sync_enabled: false
            })
        );
    }

    #[test]
    fn test_unknown_kind_is_ignored() {
        let raw = r#"{"type":"voice_command","content":"undo"}"#;
        let msg = voicecoding_core::decode_message(raw).unwrap();
        let policy = policy_with(Arc::new(MockTextSurface::new()), true);

        assert_eq!(policy.handle(&msg), None);
    }

    // ── serialisation ────────────────────────────────────────────────────────

    #[test]
    fn test_concurrent_text_never_interleaves() {
        // Arrange
        let surface = Arc::new(BufferSurface {
            text: Mutex::new(String::new()),
            char_delay: Some(Duration::from_millis(2)),
        });
        let policy = Arc::new(policy_with(surface.clone(), true));

        // Act
        let workers: Vec<_> = ["aaaaaaaa", "bbbbbbbb"]
            .into_iter()
            .map(|chunk| {
                let policy = Arc::clone(&policy);
                thread::spawn(move || policy.text(Some(chunk)))
            })
            .collect();
        for w in workers {
            assert_eq!(w.join().unwrap(), Some(ack()));
        }

        // Assert
        let result = surface.contents();
        assert!(
            result == "aaaaaaaabbbbbbbb" || result == "bbbbbbbbaaaaaaaa",
            "interleaved: {result}"
        );
    }
}
