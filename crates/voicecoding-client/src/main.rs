//! voicecoding-send: talk to a VoiceCoding host from the command line.
//!
//! # Usage
//!
//! ```text
//! voicecoding-send [--host HOST] [--port PORT] [--timeout-secs N] <COMMAND>
//!
//! Commands:
//!   text <TEXT>...             Type TEXT at the host cursor and wait for the ack
//!   shadow <TEXT> [--delete N] Replace the host field with TEXT, or with
//!                              --delete, remove N chars then append TEXT
//!   ping                       Report whether the host has sync enabled
//!   watch                      Print sync_state broadcasts until Ctrl+C
//! ```

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voicecoding_client::{RelayClient, TextOutcome};
use voicecoding_core::{ServerMessage, DEFAULT_PORT};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Send text to a VoiceCoding host the way the phone app does.
#[derive(Debug, Parser)]
#[command(name = "voicecoding-send", version)]
struct Cli {
    /// Host name or IP of the desktop running voicecoding-host.
    #[arg(long, default_value = "127.0.0.1", env = "VOICECODING_HOST")]
    host: String,

    /// Port the host listens on.
    #[arg(long, default_value_t = DEFAULT_PORT, env = "VOICECODING_PORT")]
    port: u16,

    /// Seconds to wait for the connection and for each reply.
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Type text at the host cursor.
    Text {
        /// Words are joined with single spaces.
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Live-mirror update: full replace, or partial replace with --delete.
    Shadow {
        text: String,
        /// Characters to delete before appending (capped at 100 by the host).
        #[arg(long)]
        delete: Option<u64>,
    },
    /// Ask whether sync is enabled.
    Ping,
    /// Print sync changes as the host broadcasts them.
    Watch,
}

impl Cli {
    fn url(&self) -> String {
        // Bare IPv6 literals need brackets in a URL.
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("ws://[{}]:{}", self.host, self.port)
        } else {
            format!("ws://{}:{}", self.host, self.port)
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let url = cli.url();
    let timeout = Duration::from_secs(cli.timeout_secs.max(1));
    let mut client = RelayClient::connect(&url, timeout).await?;

    let welcome = client.welcome();
    println!(
        "connected to {} ({}), sync {}",
        welcome.host_name,
        url,
        on_off(welcome.sync_enabled)
    );

    let code = match cli.command {
        Command::Text { text } => match client.send_text(&text.join(" ")).await? {
            TextOutcome::Acked => {
                println!("typed");
                ExitCode::SUCCESS
            }
            TextOutcome::SyncDisabled => {
                println!("host has sync paused; nothing typed");
                ExitCode::from(2)
            }
            TextOutcome::Failed(reason) => {
                println!("host could not type: {reason}");
                ExitCode::FAILURE
            }
        },
        Command::Shadow { text, delete } => {
            match delete {
                Some(n) => client.shadow_replace(n, &text).await?,
                None => client.shadow_full_sync(&text).await?,
            }
            // The pong arrives only after the shadow update was applied.
            let enabled = client.ping().await?;
            println!("sent (sync {})", on_off(enabled));
            ExitCode::SUCCESS
        }
        Command::Ping => {
            let enabled = client.ping().await?;
            println!("sync {}", on_off(enabled));
            ExitCode::SUCCESS
        }
        Command::Watch => {
            watch(&mut client).await?;
            ExitCode::SUCCESS
        }
    };

    client.close().await?;
    Ok(code)
}

async fn watch(client: &mut RelayClient) -> anyhow::Result<()> {
    println!("watching for sync changes, Ctrl+C to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            event = client.try_next_event(Duration::from_secs(30)) => {
                match event? {
                    Some(ServerMessage::SyncState { sync_enabled }) => {
                        println!("sync {}", on_off(sync_enabled));
                    }
                    Some(other) => println!("{}", other.kind()),
                    None => {}
                }
            }
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "paused"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
