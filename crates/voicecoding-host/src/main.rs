//! VoiceCoding host: entry point.
//!
//! Listens for phones on the local network and types whatever they dictate
//! at the desktop's current cursor position.
//!
//! # Usage
//!
//! ```text
//! voicecoding-host [OPTIONS]
//!
//! Options:
//!   --config <PATH>       Config file [default: platform config dir]
//!   --bind <IP>           Listen address [default: 0.0.0.0]
//!   --port <PORT>         Listen port [default: 9527]
//!   --host-name <NAME>    Label shown on the phone [default: machine name]
//!   --paused              Start with sync paused
//!   --dry-run             Keep text in memory instead of typing it
//!   --no-console          Do not read commands from stdin
//!   --write-config        Save the effective config and exit
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                | Overrides      |
//! |-------------------------|----------------|
//! | `VOICECODING_CONFIG`    | `--config`     |
//! | `VOICECODING_BIND`      | `--bind`       |
//! | `VOICECODING_PORT`      | `--port`       |
//! | `VOICECODING_HOST_NAME` | `--host-name`  |
//! | `RUST_LOG`              | `[logging] level` in the config file |
//!
//! Precedence is CLI flag, then environment variable, then config file, then
//! built-in default.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use voicecoding_host::application::TextSurface;
use voicecoding_host::infrastructure::console::{report_status, run_console};
use voicecoding_host::infrastructure::net::phone_url;
use voicecoding_host::infrastructure::storage::{load_config, save_config, AppConfig};
use voicecoding_host::infrastructure::text_surface::{
    ClipboardPasteSurface, MemorySurface, NativeKeySink, SystemClipboard,
};
use voicecoding_host::infrastructure::{bind_listener, serve, ServerContext};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// VoiceCoding desktop host.
///
/// Receives text from phones over WebSocket and types it at the cursor.
#[derive(Debug, Parser)]
#[command(
    name = "voicecoding-host",
    about = "Types text dictated on a phone at the desktop cursor",
    version
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "VOICECODING_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to listen on.
    ///
    /// `0.0.0.0` accepts phones on any interface (e.g. a laptop hotspot);
    /// `127.0.0.1` accepts only local connections.
    #[arg(long, env = "VOICECODING_BIND")]
    bind: Option<String>,

    /// TCP port to listen on.
    #[arg(long, env = "VOICECODING_PORT")]
    port: Option<u16>,

    /// Label sent to phones in the welcome message.
    #[arg(long, env = "VOICECODING_HOST_NAME")]
    host_name: Option<String>,

    /// Start with sync paused.
    #[arg(long)]
    paused: bool,

    /// Apply text to an in-memory buffer instead of the desktop.
    #[arg(long)]
    dry_run: bool,

    /// Do not read toggle commands from stdin.
    #[arg(long)]
    no_console: bool,

    /// Write the effective config to the config file and exit.
    #[arg(long)]
    write_config: bool,
}

impl Cli {
    /// Layers the CLI/env overrides on top of the file config.
    fn apply_to(&self, cfg: &mut AppConfig) {
        if let Some(bind) = &self.bind {
            cfg.server.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            cfg.server.port = port;
        }
        if let Some(name) = &self.host_name {
            cfg.server.host_name = Some(name.clone());
        }
        if self.paused {
            cfg.sync.enabled_on_start = false;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The config is read before logging starts because it may carry the log
    // level; a load failure is reported once logging is up.
    let (mut app_config, load_error) = match load_config(cli.config.as_deref()) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    cli.apply_to(&mut app_config);

    // ── Logging setup ─────────────────────────────────────────────────────────
    //
    // `RUST_LOG` wins; otherwise the configured level; otherwise `info`.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&app_config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(e) = load_error {
        warn!("could not load config, using defaults: {e}");
    }

    if cli.write_config {
        let path = save_config(&app_config, cli.config.as_deref())
            .context("failed to write config file")?;
        info!("wrote config to {}", path.display());
        return Ok(());
    }

    let config = app_config
        .to_host_config()
        .context("invalid listen configuration")?;

    // ── Text surface ──────────────────────────────────────────────────────────
    let surface: Arc<dyn TextSurface> = if cli.dry_run {
        info!("dry run: text is kept in memory, nothing is typed");
        Arc::new(MemorySurface::new())
    } else {
        if let Err(e) = SystemClipboard::open() {
            warn!("clipboard unavailable, typing will fail until it is: {e}");
        }
        let keys = NativeKeySink::new();
        if let Err(e) = keys.connect() {
            warn!("key injection unavailable, typing will fail until it is: {e}");
        }
        Arc::new(ClipboardPasteSurface::system(
            Box::new(keys),
            config.clipboard_settle,
            config.restore_clipboard,
        ))
    };

    let bind_addr = config.bind_addr;
    let ctx = Arc::new(ServerContext::new(config, surface));
    let hub = ctx.hub();

    info!(
        "VoiceCoding host starting as '{}' (sync {})",
        ctx.config().host_name,
        if hub.is_enabled() { "on" } else { "paused" }
    );

    // ── Graceful shutdown flag ─────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_ctrl_c = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_ctrl_c.store(false, Ordering::Relaxed);
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    // Binding is the one fatal startup step.
    let listener = bind_listener(bind_addr).await?;
    let url = phone_url(bind_addr);
    info!("phones can connect to {url}");

    tokio::spawn(report_status(hub.subscribe()));
    if !cli.no_console {
        tokio::spawn(run_console(Arc::clone(&hub), url, Arc::clone(&running)));
    }

    serve(listener, ctx, running).await?;

    info!("VoiceCoding host stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
