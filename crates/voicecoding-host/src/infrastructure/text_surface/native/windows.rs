//! Windows key injection via the SendInput API.
//!
//! All transitions of one chord go into a single `SendInput` call, so no
//! other input can land between Ctrl-down and V-down.

use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, VIRTUAL_KEY,
};

use crate::application::InjectionError;
use crate::infrastructure::text_surface::keys::KeyEvent;

/// Stateless; `SendInput` needs no connection.
pub struct PlatformKeyBackend;

impl PlatformKeyBackend {
    pub fn open() -> Result<Self, InjectionError> {
        Ok(Self)
    }

    /// Injects `events` in one `SendInput` call.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError::Platform`] if Windows injected fewer events
    /// than requested (e.g. blocked by UIPI when the focused window runs
    /// elevated).
    pub fn send(&self, events: &[KeyEvent]) -> Result<(), InjectionError> {
        let inputs: Vec<INPUT> = events.iter().map(|event| keyboard_input(*event)).collect();

        // SAFETY: `inputs` is a slice of fully initialised keyboard INPUT
        // structures and the size argument matches the element type.
        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };

        if sent as usize == inputs.len() {
            Ok(())
        } else {
            Err(InjectionError::Platform(format!(
                "SendInput injected {sent} of {} key events",
                inputs.len()
            )))
        }
    }
}

fn keyboard_input(event: KeyEvent) -> INPUT {
    let mut flags = KEYBD_EVENT_FLAGS(0);
    if !event.down {
        flags = flags | KEYEVENTF_KEYUP;
    }
    if event.key.windows_extended() {
        flags = flags | KEYEVENTF_EXTENDEDKEY;
    }

    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(event.key.windows_vk()),
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}
