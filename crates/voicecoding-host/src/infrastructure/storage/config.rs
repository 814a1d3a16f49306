//! TOML-based configuration persistence for the host.
//!
//! Reads and writes [`AppConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\VoiceCoding\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/voicecoding/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/VoiceCoding/config.toml`
//!
//! # Example file
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 9527
//! host_name = "studio-desktop"
//!
//! [sync]
//! enabled_on_start = true
//!
//! [injection]
//! clipboard_settle_ms = 100
//! restore_clipboard = true
//!
//! [session]
//! keepalive_interval_secs = 15
//! idle_timeout_secs = 45
//!
//! [logging]
//! level = "info"
//! ```
//!
//! # Serde default values
//!
//! Every section and every field has a default, so an empty file, a partial
//! file and no file at all all load successfully.  Fields annotated with
//! `#[serde(default = "some_fn")]` use `some_fn()` when absent.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use voicecoding_core::DEFAULT_PORT;

use crate::domain::config::{machine_name, HostConfig, DEFAULT_WELCOME_MESSAGE};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `server.bind_address` is not an IP address.
    #[error("invalid bind address '{0}'")]
    InvalidBindAddress(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub injection: InjectionConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener and welcome settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// IP address to bind.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Label sent to phones.  Absent means "use the machine name".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Whether typing is enabled when the host starts.
    #[serde(default = "default_true")]
    pub enabled_on_start: bool,
}

/// Clipboard-paste surface tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InjectionConfig {
    /// Pause after the paste chord before the clipboard is restored.
    #[serde(default = "default_clipboard_settle_ms")]
    pub clipboard_settle_ms: u64,
    #[serde(default = "default_true")]
    pub restore_clipboard: bool,
}

/// Per-connection timers, all in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset, e.g. `"info"` or
    /// `"voicecoding_host=debug"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_welcome_message() -> String {
    DEFAULT_WELCOME_MESSAGE.to_string()
}
fn default_true() -> bool {
    true
}
fn default_clipboard_settle_ms() -> u64 {
    100
}
fn default_keepalive_interval_secs() -> u64 {
    15
}
fn default_idle_timeout_secs() -> u64 {
    45
}
fn default_send_timeout_secs() -> u64 {
    5
}
fn default_handshake_timeout_secs() -> u64 {
    5
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            host_name: None,
            welcome_message: default_welcome_message(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled_on_start: default_true(),
        }
    }
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            clipboard_settle_ms: default_clipboard_settle_ms(),
            restore_clipboard: default_true(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keepalive_interval_secs: default_keepalive_interval_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            send_timeout_secs: default_send_timeout_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ── Conversion to the runtime config ─────────────────────────────────────────

impl AppConfig {
    /// Resolves the file settings into the [`HostConfig`] the server uses.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] if `server.bind_address`
    /// is not an IP address.
    pub fn to_host_config(&self) -> Result<HostConfig, ConfigError> {
        let ip: IpAddr = self
            .server
            .bind_address
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.server.bind_address.clone()))?;

        let host_name = self
            .server
            .host_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(machine_name);

        // Zero-length timers would spin or drop every session immediately.
        let secs = |value: u64| Duration::from_secs(value.max(1));

        Ok(HostConfig {
            bind_addr: SocketAddr::new(ip, self.server.port),
            host_name,
            welcome_message: self.server.welcome_message.clone(),
            sync_enabled_on_start: self.sync.enabled_on_start,
            clipboard_settle: Duration::from_millis(self.injection.clipboard_settle_ms),
            restore_clipboard: self.injection.restore_clipboard,
            keepalive_interval: secs(self.session.keepalive_interval_secs),
            idle_timeout: secs(self.session.idle_timeout_secs),
            send_timeout: secs(self.session.send_timeout_secs),
            handshake_timeout: secs(self.session.handshake_timeout_secs),
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from `path`, or from the default location when `path`
/// is `None`.  A missing file yields `AppConfig::default()`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Persists `config` to `path` (or the default location) and returns the
/// path written.
///
/// Creates the config directory if it does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Resolves the platform config base directory plus the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("VoiceCoding"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("VoiceCoding")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("voicecoding"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
