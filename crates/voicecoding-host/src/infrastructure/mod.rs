//! Infrastructure layer for voicecoding-host.
//!
//! The infrastructure layer handles all I/O: sockets, the clipboard, key
//! automation, the config file and the terminal.
//!
//! # Responsibilities
//!
//! - Binding the WebSocket listener and running one task per phone
//! - Pressing keys and swapping the clipboard to inject text
//! - Reading and writing the TOML config file
//! - The stdin console that toggles sync
//! - Working out the LAN address to show the user
//!
//! # What does NOT belong here?
//!
//! - Deciding what a message means (application layer)
//! - Message type definitions (`voicecoding-core`)

pub mod console;
pub mod net;
pub mod storage;
pub mod text_surface;
pub mod ws_server;

// Re-export the primary entry points so `main.rs` can call them concisely.
pub use ws_server::{bind_listener, run_server, serve, ServerContext};
