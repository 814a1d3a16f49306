//! macOS key injection via CoreGraphics events.
//!
//! Each key transition becomes a `CGEvent` keyboard event posted at the HID
//! tap, the same level as physical keyboard input.  While Command is held,
//! the command flag is set on every following event so the target app sees
//! Cmd+V rather than a bare V.
//!
//! # Accessibility permission
//!
//! Posting at the HID tap requires the host (or the terminal running it) to
//! be listed under System Settings → Privacy & Security → Accessibility.
//! Without it the events are silently discarded.

use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

use crate::application::InjectionError;
use crate::infrastructure::text_surface::keys::{Key, KeyEvent};

/// Stateless; an event source is created per chord.
pub struct PlatformKeyBackend;

impl PlatformKeyBackend {
    pub fn open() -> Result<Self, InjectionError> {
        Ok(Self)
    }

    /// Posts `events` in order.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError::Platform`] if CoreGraphics refuses to create
    /// the event source or an event.
    pub fn send(&self, events: &[KeyEvent]) -> Result<(), InjectionError> {
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState).map_err(|_| {
            InjectionError::Platform("cannot create CoreGraphics event source".to_string())
        })?;

        let mut command_held = false;
        for event in events {
            if event.key == Key::Command {
                command_held = event.down;
            }
            let cg_event =
                CGEvent::new_keyboard_event(source.clone(), event.key.macos_keycode(), event.down)
                    .map_err(|_| {
                        InjectionError::Platform(format!(
                            "cannot create keyboard event for {:?}",
                            event.key
                        ))
                    })?;
            if command_held {
                cg_event.set_flags(CGEventFlags::CGEventFlagCommand);
            }
            cg_event.post(CGEventTapLocation::HID);
        }
        Ok(())
    }
}
