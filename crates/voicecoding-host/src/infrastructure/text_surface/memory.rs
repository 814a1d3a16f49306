//! In-memory text surface for tests and dry runs.
//!
//! Models a single text field with the cursor pinned at the end, which is
//! exactly what a phone dictating into a focused editor sees: inserts append,
//! deletes remove from the tail.
//!
//! # Usage in tests
//!
//! ```rust
//! use voicecoding_host::application::TextSurface;
//! use voicecoding_host::infrastructure::text_surface::MemorySurface;
//!
//! let surface = MemorySurface::with_text("hello ");
//! surface.insert_at_cursor("world").unwrap();
//! assert_eq!(surface.contents(), "hello world");
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::application::{InjectionError, TextSurface};

#[derive(Debug, Default)]
pub struct MemorySurface {
    text: Mutex<String>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(text.into()),
        }
    }

    /// Current contents of the field.
    pub fn contents(&self) -> String {
        self.buffer().clone()
    }

    fn buffer(&self) -> MutexGuard<'_, String> {
        self.text.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TextSurface for MemorySurface {
    fn insert_at_cursor(&self, text: &str) -> Result<(), InjectionError> {
        let mut buf = self.buffer();
        buf.push_str(text);
        debug!(inserted = text.chars().count(), total = buf.chars().count(), "memory surface insert");
        Ok(())
    }

    fn replace_all(&self, text: &str) -> Result<(), InjectionError> {
        let mut buf = self.buffer();
        buf.clear();
        buf.push_str(text);
        debug!(total = buf.chars().count(), "memory surface replace");
        Ok(())
    }

    fn delete_before_cursor(&self, count: usize) -> Result<(), InjectionError> {
        let mut buf = self.buffer();
        // Count characters, not bytes, so multi-byte text deletes cleanly.
        let removed = (0..count).take_while(|_| buf.pop().is_some()).count();
        debug!(requested = count, removed, "memory surface delete");
        Ok(())
    }
}
