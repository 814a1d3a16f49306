//! Clipboard-paste text surface.
//!
//! Typing arbitrary Unicode one key at a time is slow and layout-dependent.
//! Pasting is neither, so text is injected like this:
//!
//! 1. Save the current clipboard text (if restoring is enabled).
//! 2. Put the new text on the clipboard.
//! 3. Press the paste chord.
//! 4. Wait for the settle delay so the target app reads the clipboard.
//! 5. Put the saved text back.
//!
//! `replace_all` presses select-all first.  Replacing with an empty string
//! presses select-all then Delete and never touches the clipboard.

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::application::{InjectionError, TextSurface};
use crate::infrastructure::text_surface::keys::{KeyChord, KeyChordSink};

/// Read/write access to the clipboard's text.
pub trait ClipboardStore {
    /// Current clipboard text, or `None` if it holds no text.
    fn get_text(&mut self) -> Option<String>;
    fn set_text(&mut self, text: &str) -> Result<(), InjectionError>;
}

/// Opens a clipboard handle for the duration of one paste.
///
/// On X11 the process serves the clipboard contents only while a handle is
/// alive, so the handle must outlive the paste chord.
pub type ClipboardOpener =
    Box<dyn Fn() -> Result<Box<dyn ClipboardStore>, InjectionError> + Send + Sync>;

/// The OS clipboard via `arboard`.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    /// Opens the OS clipboard.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError::Clipboard`] when no clipboard is available
    /// (e.g. a headless Linux session).
    pub fn open() -> Result<Self, InjectionError> {
        let inner =
            arboard::Clipboard::new().map_err(|e| InjectionError::Clipboard(e.to_string()))?;
        Ok(Self { inner })
    }
}

impl ClipboardStore for SystemClipboard {
    fn get_text(&mut self) -> Option<String> {
        self.inner.get_text().ok()
    }

    fn set_text(&mut self, text: &str) -> Result<(), InjectionError> {
        self.inner
            .set_text(text)
            .map_err(|e| InjectionError::Clipboard(e.to_string()))
    }
}

/// A [`TextSurface`] that pastes through the clipboard.
///
/// Calls are not serialised here; the injection policy already holds the
/// global injection lock around every surface call.
pub struct ClipboardPasteSurface {
    open_clipboard: ClipboardOpener,
    keys: Box<dyn KeyChordSink>,
    settle: Duration,
    restore: bool,
}

impl ClipboardPasteSurface {
    pub fn new(
        open_clipboard: ClipboardOpener,
        keys: Box<dyn KeyChordSink>,
        settle: Duration,
        restore: bool,
    ) -> Self {
        Self {
            open_clipboard,
            keys,
            settle,
            restore,
        }
    }

    /// Surface over the OS clipboard.
    pub fn system(keys: Box<dyn KeyChordSink>, settle: Duration, restore: bool) -> Self {
        let opener: ClipboardOpener = Box::new(|| {
            SystemClipboard::open().map(|c| Box::new(c) as Box<dyn ClipboardStore>)
        });
        Self::new(opener, keys, settle, restore)
    }

    fn paste(&self, text: &str) -> Result<(), InjectionError> {
        let mut clipboard = (self.open_clipboard)()?;
        let saved = if self.restore {
            clipboard.get_text()
        } else {
            None
        };

        clipboard.set_text(text)?;
        let pasted = self.keys.press(KeyChord::Paste);
        thread::sleep(self.settle);

        if let Some(previous) = saved {
            if let Err(e) = clipboard.set_text(&previous) {
                warn!("could not restore clipboard: {e}");
            }
        }
        pasted?;
        debug!(chars = text.chars().count(), "pasted text");
        Ok(())
    }
}

impl TextSurface for ClipboardPasteSurface {
    fn insert_at_cursor(&self, text: &str) -> Result<(), InjectionError> {
        if text.is_empty() {
            return Ok(());
        }
        self.paste(text)
    }

    fn replace_all(&self, text: &str) -> Result<(), InjectionError> {
        self.keys.press(KeyChord::SelectAll)?;
        if text.is_empty() {
            self.keys.press(KeyChord::Delete)
        } else {
            self.paste(text)
        }
    }

    fn delete_before_cursor(&self, count: usize) -> Result<(), InjectionError> {
        if count == 0 {
            return Ok(());
        }
        self.keys.press(KeyChord::Backspace(count))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
