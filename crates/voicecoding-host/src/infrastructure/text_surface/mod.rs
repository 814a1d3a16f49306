//! Text-surface adapters: how injected text actually reaches the desktop.
//!
//! | Adapter                  | Used for                                      |
//! |--------------------------|-----------------------------------------------|
//! | [`ClipboardPasteSurface`]| Real desktop: clipboard swap + paste chord    |
//! | [`MemorySurface`]        | Tests and `--dry-run`: an in-process buffer   |
//!
//! The clipboard surface does not press keys itself.  It asks a
//! [`KeyChordSink`] to do so; [`NativeKeySink`] injects the keystrokes
//! through the OS input API (see `native/`).

pub mod clipboard;
pub mod keys;
pub mod memory;
mod native;

pub use clipboard::{ClipboardOpener, ClipboardPasteSurface, ClipboardStore, SystemClipboard};
pub use keys::{key_events, Key, KeyChord, KeyChordSink, KeyEvent, NativeKeySink, Platform};
pub use memory::MemorySurface;
