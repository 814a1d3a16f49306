//! voicecoding-client library crate.
//!
//! The phone side of the VoiceCoding relay protocol, for scripts, tests and
//! anyone without the phone app:
//!
//! 1. Connect and wait for the host's `connected` welcome.
//! 2. Send `text` and wait for `ack` (or `sync_disabled`).
//! 3. Send fire-and-forget `shadow_full_sync` / `shadow_replace` updates.
//! 4. `ping` to learn whether the host has sync paused.
//! 5. Watch for `sync_state` broadcasts.
//!
//! Every wait is bounded by the timeout given to [`RelayClient::connect`].

pub mod connection;

pub use connection::{ClientError, RelayClient, TextOutcome, Welcome};
