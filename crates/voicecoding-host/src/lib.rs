//! voicecoding-host library crate.
//!
//! The desktop side of VoiceCoding: accepts WebSocket connections from phones,
//! decides how each incoming snippet changes the focused text field, and keeps
//! every phone informed when the host pauses or resumes sync.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Phone (JSON over WebSocket)
//!         ↕
//! [voicecoding-host]
//!   ├── domain/           HostConfig
//!   ├── application/      Session, SessionRegistry, SessionHub (sync gate),
//!   │                     InjectionPolicy + the TextSurface seam
//!   └── infrastructure/
//!         ├── ws_server/     accept loop and per-session tasks
//!         ├── text_surface/  in-memory and clipboard-paste surfaces
//!         ├── storage/       TOML configuration file
//!         ├── console/       stdin toggle and status lines
//!         └── net/           local address lookup
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `voicecoding-core`; its only tokio
//!   use is channel types for session send queues and status notifications.
//! - `infrastructure` owns sockets, the clipboard, processes and files.

/// Domain layer: plain runtime configuration.
pub mod domain;

/// Application layer: sessions, sync gate, and injection policy.
pub mod application;

/// Infrastructure layer: WebSocket server, text surfaces, config file, console.
pub mod infrastructure;
