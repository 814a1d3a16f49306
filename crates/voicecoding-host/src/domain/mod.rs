//! Domain layer for voicecoding-host.
//!
//! Pure types with no dependencies on I/O, networking, or the OS.  Protocol
//! messages and the sync gate live in `voicecoding-core`; this layer only adds
//! the host's runtime configuration.

pub mod config;

pub use config::HostConfig;
