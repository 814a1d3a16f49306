//! Host runtime configuration.
//!
//! [`HostConfig`] is what the server loop actually consumes.  It is built once
//! at startup from the TOML file plus CLI overrides (see
//! `infrastructure::storage::config`) and then shared behind an `Arc`.
//!
//! Keeping it a plain struct with no file or environment access means tests
//! can build one directly.

use std::net::SocketAddr;
use std::time::Duration;

use voicecoding_core::DEFAULT_PORT;

/// Default welcome text sent in the `connected` message.
pub const DEFAULT_WELCOME_MESSAGE: &str = "Connected to Voice Coding server";

/// Fallback label when no host name can be determined.
pub const FALLBACK_HOST_NAME: &str = "voicecoding-host";

/// All runtime settings for the host.
///
/// # Example
///
/// ```rust
/// use voicecoding_host::domain::HostConfig;
///
/// let cfg = HostConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 9527);
/// assert!(cfg.sync_enabled_on_start);
/// ```
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Address the WebSocket listener binds to.
    ///
    /// `0.0.0.0` accepts phones on the local hotspot.  There is no client
    /// authentication; reachability is the trust boundary.
    pub bind_addr: SocketAddr,

    /// Label sent to phones in the `connected` message.
    pub host_name: String,

    /// Human-readable text sent in the `connected` message.
    pub welcome_message: String,

    /// Initial value of the sync gate.
    pub sync_enabled_on_start: bool,

    /// How long the clipboard-paste surface waits after pasting before it
    /// restores the previous clipboard.
    pub clipboard_settle: Duration,

    /// Whether the clipboard-paste surface restores the previous clipboard.
    pub restore_clipboard: bool,

    /// Interval between WebSocket protocol pings to each phone.
    pub keepalive_interval: Duration,

    /// A session that sends nothing (not even a pong) for this long is closed.
    pub idle_timeout: Duration,

    /// Upper bound on a single outbound frame write.
    pub send_timeout: Duration,

    /// Upper bound on the WebSocket upgrade handshake.
    pub handshake_timeout: Duration,
}

impl Default for HostConfig {
    /// | Field                 | Default           |
    /// |-----------------------|-------------------|
    /// | bind_addr             | `0.0.0.0:9527`    |
    /// | host_name             | machine name      |
    /// | sync_enabled_on_start | `true`            |
    /// | clipboard_settle      | 100 ms            |
    /// | keepalive_interval    | 15 s              |
    /// | idle_timeout          | 45 s              |
    /// | send_timeout          | 5 s               |
    /// | handshake_timeout     | 5 s               |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            host_name: machine_name(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            sync_enabled_on_start: true,
            clipboard_settle: Duration::from_millis(100),
            restore_clipboard: true,
            keepalive_interval: Duration::from_secs(15),
            idle_timeout: Duration::from_secs(45),
            send_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

/// Returns the machine's name for the `connected` welcome.
///
/// Tries `COMPUTERNAME` (Windows) first, then `HOSTNAME` (Unix), and falls
/// back to [`FALLBACK_HOST_NAME`].
pub fn machine_name() -> String {
    std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_HOST_NAME.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
