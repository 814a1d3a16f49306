//! Domain types for VoiceCoding.
//!
//! Pure state with no I/O, no async, and no locking.  The host wraps these in
//! its own synchronisation; the client only reads them.

/// Global sync on/off gate.
pub mod sync_state;

/// Session identity and lifecycle phase.
pub mod session;
