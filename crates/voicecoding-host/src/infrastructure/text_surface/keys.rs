//! Key chords and the native backend that presses them.
//!
//! # How a chord becomes keystrokes (for beginners)
//!
//! The clipboard surface thinks in *chords*: "paste", "select all",
//! "delete", "backspace N times".  Each chord expands into a list of
//! platform-neutral [`KeyEvent`]s (key down / key up), and each [`Key`] has a
//! fixed code per platform:
//!
//! ```text
//! KeyChord ──key_events()──► [KeyEvent] ──Key::x11_keysym / windows_vk / macos_keycode──► OS
//! ```
//!
//! | Platform | Injection API                         | Crate           |
//! |----------|---------------------------------------|-----------------|
//! | Linux    | XTest `FakeInput` on the X display    | `x11rb`         |
//! | macOS    | `CGEventPost` at the HID tap          | `core-graphics` |
//! | Windows  | `SendInput`                           | `windows`       |
//!
//! The expansion and the code tables are pure, so they are unit-tested on
//! every host regardless of which OS runs the tests.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::application::InjectionError;
use crate::infrastructure::text_surface::native::PlatformKeyBackend;

/// A keyboard action the clipboard surface needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyChord {
    /// Ctrl+V (Cmd+V on macOS).
    Paste,
    /// Ctrl+A (Cmd+A on macOS).
    SelectAll,
    /// Delete the current selection.
    Delete,
    /// Press Backspace this many times.
    Backspace(usize),
}

/// Something that can press key chords on the focused window.
pub trait KeyChordSink: Send + Sync {
    fn press(&self, chord: KeyChord) -> Result<(), InjectionError>;
}

/// Target platform for [`key_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// The modifier that goes with V and A for paste and select-all.
    fn shortcut_modifier(self) -> Key {
        match self {
            Platform::MacOs => Key::Command,
            Platform::Linux | Platform::Windows => Key::Control,
        }
    }
}

// ── Keys ──────────────────────────────────────────────────────────────────────

/// The physical keys the chords use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Control,
    Command,
    V,
    A,
    /// Forward delete; with a selection it removes the selection.
    ForwardDelete,
    Backspace,
}

impl Key {
    /// Every key, for building lookup tables.
    pub const ALL: [Key; 6] = [
        Key::Control,
        Key::Command,
        Key::V,
        Key::A,
        Key::ForwardDelete,
        Key::Backspace,
    ];

    /// X11 KeySym (see `X11/keysymdef.h`).
    pub fn x11_keysym(self) -> u32 {
        match self {
            Key::Control => 0xFFE3, // XK_Control_L
            Key::Command => 0xFFEB, // XK_Super_L
            Key::V => 0x0076,       // XK_v
            Key::A => 0x0061,       // XK_a
            Key::ForwardDelete => 0xFFFF,
            Key::Backspace => 0xFF08,
        }
    }

    /// Windows virtual-key code.
    pub fn windows_vk(self) -> u16 {
        match self {
            Key::Control => 0x11, // VK_CONTROL
            Key::Command => 0x5B, // VK_LWIN
            Key::V => 0x56,
            Key::A => 0x41,
            Key::ForwardDelete => 0x2E, // VK_DELETE
            Key::Backspace => 0x08,     // VK_BACK
        }
    }

    /// Whether Windows needs `KEYEVENTF_EXTENDEDKEY` for this key.
    pub fn windows_extended(self) -> bool {
        matches!(self, Key::ForwardDelete | Key::Command)
    }

    /// macOS `CGKeyCode` on an ANSI layout.
    pub fn macos_keycode(self) -> u16 {
        match self {
            Key::Control => 59,
            Key::Command => 55,
            Key::V => 9,
            Key::A => 0,
            Key::ForwardDelete => 117,
            Key::Backspace => 51,
        }
    }
}

/// One key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub down: bool,
}

impl KeyEvent {
    fn down(key: Key) -> Self {
        Self { key, down: true }
    }

    fn up(key: Key) -> Self {
        Self { key, down: false }
    }
}

/// Expands `chord` into the key transitions to inject on `platform`.
///
/// `Backspace(0)` expands to nothing.
pub fn key_events(platform: Platform, chord: KeyChord) -> Vec<KeyEvent> {
    let tap = |key: Key| [KeyEvent::down(key), KeyEvent::up(key)];
    let shortcut = |key: Key| {
        let modifier = platform.shortcut_modifier();
        vec![
            KeyEvent::down(modifier),
            KeyEvent::down(key),
            KeyEvent::up(key),
            KeyEvent::up(modifier),
        ]
    };

    match chord {
        KeyChord::Paste => shortcut(Key::V),
        KeyChord::SelectAll => shortcut(Key::A),
        KeyChord::Delete => tap(Key::ForwardDelete).to_vec(),
        KeyChord::Backspace(n) => (0..n).flat_map(|_| tap(Key::Backspace)).collect(),
    }
}

// ── Native sink ───────────────────────────────────────────────────────────────

/// Presses chords through the OS input-injection API.
///
/// The backend (an X connection on Linux) is opened on first use and kept.
/// If opening fails, the error is returned for that chord and the next
/// chord tries again, so a host started before the desktop session is ready
/// recovers on its own.
pub struct NativeKeySink {
    platform: Platform,
    backend: Mutex<Option<PlatformKeyBackend>>,
}

impl NativeKeySink {
    pub fn new() -> Self {
        Self {
            platform: Platform::current(),
            backend: Mutex::new(None),
        }
    }

    /// Opens the backend now instead of on the first chord.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError::Platform`] when the OS refuses input
    /// injection (no X display, no XTest extension, ...).
    pub fn connect(&self) -> Result<(), InjectionError> {
        let mut backend = self.backend.lock().unwrap_or_else(PoisonError::into_inner);
        if backend.is_none() {
            *backend = Some(PlatformKeyBackend::open()?);
        }
        Ok(())
    }
}

impl Default for NativeKeySink {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyChordSink for NativeKeySink {
    fn press(&self, chord: KeyChord) -> Result<(), InjectionError> {
        let events = key_events(self.platform, chord);
        if events.is_empty() {
            return Ok(());
        }
        debug!(?chord, events = events.len(), "pressing key chord");

        let mut slot = self.backend.lock().unwrap_or_else(PoisonError::into_inner);
        let backend = match slot.take() {
            Some(backend) => backend,
            None => PlatformKeyBackend::open()?,
        };
        let result = backend.send(&events);
        // A broken connection is dropped here and reopened on the next chord.
        if result.is_ok() {
            *slot = Some(backend);
        }
        result
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
