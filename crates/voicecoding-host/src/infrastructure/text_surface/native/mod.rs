//! Platform-specific key injection backends.
//!
//! The correct implementation is selected at compile time via
//! `#[cfg(target_os = ...)]`.  Each one exposes the same
//! `PlatformKeyBackend` with `open()` and `send(&[KeyEvent])`.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::PlatformKeyBackend;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::PlatformKeyBackend;

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use self::windows::PlatformKeyBackend;

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
mod unsupported;
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub use unsupported::PlatformKeyBackend;
