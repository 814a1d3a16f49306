//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML file from the platform config
//! directory, falls back to defaults on first run, and writes the effective
//! configuration back when asked (`--write-config`).

pub mod config;

pub use config::{load_config, save_config, AppConfig, ConfigError};
