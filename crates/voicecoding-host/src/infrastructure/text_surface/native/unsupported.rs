//! Fallback for platforms without a key injection backend.

use crate::application::InjectionError;
use crate::infrastructure::text_surface::keys::KeyEvent;

pub struct PlatformKeyBackend;

impl PlatformKeyBackend {
    pub fn open() -> Result<Self, InjectionError> {
        Err(InjectionError::Platform(format!(
            "key injection is not supported on {}",
            std::env::consts::OS
        )))
    }

    pub fn send(&self, _events: &[KeyEvent]) -> Result<(), InjectionError> {
        Ok(())
    }
}
