//! Linux X11 key injection via the XTest extension.
//!
//! # What is XTest? (for beginners)
//!
//! XTest is an X11 protocol extension that lets a client synthesize keyboard
//! events as if the user had pressed the keys.  The focused window receives
//! them exactly like real input.
//!
//! XTest takes an X11 *keycode* (a server-specific number), not a KeySym.
//! The keyboard mapping is fetched once when the connection opens and the
//! few keys the chords need are looked up:
//!
//! ```text
//! Key ──x11_keysym()──► KeySym ──keyboard mapping──► keycode ──FakeInput──► X server
//! ```
//!
//! The connection is pure Rust (`x11rb`), so no Xlib/Xtst development
//! libraries are needed at build time.
//!
//! # Permissions
//!
//! The process needs access to the display named by `DISPLAY`.  Wayland
//! sessions reach XWayland windows only.

use std::collections::HashMap;

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    ConnectionExt as _, Keycode, Keysym, Window, KEY_PRESS_EVENT, KEY_RELEASE_EVENT,
};
use x11rb::protocol::xtest::ConnectionExt as _;
use x11rb::rust_connection::RustConnection;
use x11rb::CURRENT_TIME;

use crate::application::InjectionError;
use crate::infrastructure::text_surface::keys::{Key, KeyEvent};

/// `deviceid` value meaning "the core keyboard".
const CORE_DEVICE: u8 = 0;

fn platform_error(context: &str, e: impl std::fmt::Display) -> InjectionError {
    InjectionError::Platform(format!("{context}: {e}"))
}

/// An open X connection plus the keycodes of every [`Key`].
pub struct PlatformKeyBackend {
    conn: RustConnection,
    root: Window,
    keycodes: HashMap<Key, Keycode>,
}

impl PlatformKeyBackend {
    /// Connects to `$DISPLAY`, checks for XTest and reads the keyboard
    /// mapping.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError::Platform`] if the display cannot be opened
    /// or the server lacks XTest.
    pub fn open() -> Result<Self, InjectionError> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(|e| platform_error("cannot open X display", e))?;

        conn.xtest_get_version(2, 2)
            .map_err(|e| platform_error("XTest request failed", e))?
            .reply()
            .map_err(|e| platform_error("X server has no XTest extension", e))?;

        let setup = conn.setup();
        let root = setup
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| InjectionError::Platform(format!("no X screen {screen_num}")))?;
        let min_keycode = setup.min_keycode;
        let count = setup.max_keycode.saturating_sub(min_keycode).saturating_add(1);

        let mapping = conn
            .get_keyboard_mapping(min_keycode, count)
            .map_err(|e| platform_error("keyboard mapping request failed", e))?
            .reply()
            .map_err(|e| platform_error("keyboard mapping unavailable", e))?;
        let keycodes = keycode_table(
            min_keycode,
            mapping.keysyms_per_keycode,
            &mapping.keysyms,
        );

        Ok(Self {
            conn,
            root,
            keycodes,
        })
    }

    /// Injects `events` in order and flushes them to the server.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError::Platform`] if a key has no keycode in the
    /// current layout or the connection broke.
    pub fn send(&self, events: &[KeyEvent]) -> Result<(), InjectionError> {
        for event in events {
            let keycode = *self.keycodes.get(&event.key).ok_or_else(|| {
                InjectionError::Platform(format!("{:?} has no keycode in this layout", event.key))
            })?;
            let kind = if event.down {
                KEY_PRESS_EVENT
            } else {
                KEY_RELEASE_EVENT
            };
            self.conn
                .xtest_fake_input(kind, keycode, CURRENT_TIME, self.root, 0, 0, CORE_DEVICE)
                .map_err(|e| platform_error("XTest FakeInput failed", e))?;
        }
        self.conn
            .flush()
            .map_err(|e| platform_error("X flush failed", e))
    }
}

/// Finds the first keycode whose mapping contains each key's KeySym.
fn keycode_table(
    min_keycode: Keycode,
    keysyms_per_keycode: u8,
    keysyms: &[Keysym],
) -> HashMap<Key, Keycode> {
    let per = usize::from(keysyms_per_keycode).max(1);
    let mut table = HashMap::new();
    for key in Key::ALL {
        let wanted = key.x11_keysym();
        let found = keysyms
            .chunks(per)
            .position(|syms| syms.contains(&wanted))
            .and_then(|index| u8::try_from(index).ok())
            .map(|offset| min_keycode.saturating_add(offset));
        if let Some(keycode) = found {
            table.insert(key, keycode);
        }
    }
    table
}
