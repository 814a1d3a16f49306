//! The global sync gate.
//!
//! When sync is disabled the host keeps its connections open but stops
//! applying phone text to the desktop.  There is exactly one gate per host
//! process; it is never per-session.

/// Process-wide sync flag.  Starts enabled.
///
/// # Examples
///
/// ```rust
/// use voicecoding_core::SyncState;
///
/// let mut sync = SyncState::default();
/// assert!(sync.is_enabled());
/// assert!(!sync.toggle());
/// assert!(!sync.is_enabled());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    enabled: bool,
}

impl Default for SyncState {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl SyncState {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flips the flag and returns the new value.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Sets the flag.  Returns `true` if the value changed.
    pub fn set(&mut self, enabled: bool) -> bool {
        let changed = self.enabled != enabled;
        self.enabled = enabled;
        changed
    }
}
