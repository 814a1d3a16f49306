//! Stdin console: the host-side sync toggle.
//!
//! ```text
//! t, toggle   flip sync on/off
//! on / off    set sync explicitly
//! s, status   show sync state, connected phones and the address to connect to
//! q, quit     stop the host
//! ```
//!
//! A second task, [`report_status`], watches the hub and logs the
//! "waiting / connected" transitions that a tray icon would otherwise show.

use std::io::BufRead;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::application::{HostStatus, SessionHub};

const HELP: &str = "commands: t|toggle, on, off, s|status, q|quit";

/// A parsed console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Toggle,
    On,
    Off,
    Status,
    Quit,
    Help,
}

/// Parses one line of input.  Blank lines yield `None`; anything
/// unrecognised is [`ConsoleCommand::Help`].
pub fn parse(line: &str) -> Option<ConsoleCommand> {
    let cmd = match line.trim().to_ascii_lowercase().as_str() {
        "" => return None,
        "t" | "toggle" => ConsoleCommand::Toggle,
        "on" => ConsoleCommand::On,
        "off" => ConsoleCommand::Off,
        "s" | "status" => ConsoleCommand::Status,
        "q" | "quit" | "exit" => ConsoleCommand::Quit,
        _ => ConsoleCommand::Help,
    };
    Some(cmd)
}

/// One-line summary printed by `status`.
pub fn status_line(status: HostStatus, phone_url: &str) -> String {
    let sync = if status.sync_enabled { "ON" } else { "PAUSED" };
    let phones = match status.clients {
        0 => "waiting for phone".to_string(),
        1 => "1 phone connected".to_string(),
        n => format!("{n} phones connected"),
    };
    format!("sync {sync} | {phones} | connect to {phone_url}")
}

/// Applies `cmd` to the hub and returns the text to print.
pub fn execute(cmd: ConsoleCommand, hub: &SessionHub, phone_url: &str) -> String {
    match cmd {
        ConsoleCommand::Toggle => {
            let enabled = hub.toggle();
            format!("sync {}", if enabled { "ON" } else { "PAUSED" })
        }
        ConsoleCommand::On | ConsoleCommand::Off => {
            let enabled = cmd == ConsoleCommand::On;
            let changed = hub.set_enabled(enabled);
            let state = if enabled { "ON" } else { "PAUSED" };
            if changed {
                format!("sync {state}")
            } else {
                format!("sync already {state}")
            }
        }
        ConsoleCommand::Status => {
            let mut out = status_line(hub.status(), phone_url);
            for phone in hub.sessions() {
                out.push_str(&format!("\n  phone {} ({})", phone.remote_addr, phone.id));
            }
            out
        }
        ConsoleCommand::Quit => "shutting down".to_string(),
        ConsoleCommand::Help => HELP.to_string(),
    }
}

/// Reads stdin lines on a detached OS thread.
///
/// A blocking stdin read inside the runtime would keep the runtime from
/// shutting down after Ctrl+C; a plain thread does not hold up process exit.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("console-stdin".to_string())
        .spawn(move || forward_lines(std::io::stdin().lock(), &tx));
    if let Err(e) = spawned {
        warn!("could not start console reader: {e}");
    }
    rx
}

/// Sends each line of `input` to `tx` until end of input, a read error, or
/// the receiver going away.  Returns how many lines were forwarded.
fn forward_lines(input: impl BufRead, tx: &mpsc::UnboundedSender<String>) -> usize {
    let mut forwarded = 0;
    for line in input.lines() {
        let Ok(line) = line else { break };
        if tx.send(line).is_err() {
            break;
        }
        forwarded += 1;
    }
    forwarded
}

/// Reads commands from stdin until `quit`, end of input, or `running` is
/// cleared.  `quit` clears `running` itself.
pub async fn run_console(hub: Arc<SessionHub>, phone_url: String, running: Arc<AtomicBool>) {
    println!("{}", status_line(hub.status(), &phone_url));
    println!("{HELP}");

    let mut lines = spawn_stdin_reader();
    while running.load(Ordering::Relaxed) {
        let line = match timeout(Duration::from_millis(200), lines.recv()).await {
            Err(_) => continue,
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("console input closed; press Ctrl+C to stop");
                return;
            }
        };

        let Some(cmd) = parse(&line) else { continue };
        println!("{}", execute(cmd, &hub, &phone_url));
        if cmd == ConsoleCommand::Quit {
            running.store(false, Ordering::Relaxed);
        }
    }
}

/// Describes a status change worth logging, if any.
pub fn describe_change(prev: HostStatus, next: HostStatus) -> Option<String> {
    let mut parts = Vec::new();
    if prev.sync_enabled != next.sync_enabled {
        parts.push(if next.sync_enabled {
            "sync resumed".to_string()
        } else {
            "sync paused".to_string()
        });
    }
    if prev.clients != next.clients {
        parts.push(match next.clients {
            0 => "waiting for phone".to_string(),
            n => format!("{n} phone(s) connected"),
        });
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Logs hub status transitions until the hub is dropped.
pub async fn report_status(mut status: watch::Receiver<HostStatus>) {
    let mut prev = *status.borrow_and_update();
    while status.changed().await.is_ok() {
        let next = *status.borrow_and_update();
        if let Some(change) = describe_change(prev, next) {
            info!("{change}");
        }
        prev = next;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::SessionHandle;
    use voicecoding_core::{ServerMessage, SessionInfo};

    const URL: &str = "ws://192.168.43.1:9527";

    #[test]
    fn test_parse_accepts_short_and_long_forms() {
        assert_eq!(parse("t"), Some(ConsoleCommand::Toggle));
        assert_eq!(parse(" Toggle \n"), Some(ConsoleCommand::Toggle));
        assert_eq!(parse("on"), Some(ConsoleCommand::On));
        assert_eq!(parse("OFF"), Some(ConsoleCommand::Off));
        assert_eq!(parse("s"), Some(ConsoleCommand::Status));
        assert_eq!(parse("quit"), Some(ConsoleCommand::Quit));
    }

    #[test]
    fn test_parse_blank_is_none_and_unknown_is_help() {
        assert_eq!(parse("   "), None);
        assert_eq!(parse("reboot"), Some(ConsoleCommand::Help));
    }

    #[test]
    fn test_status_line_waiting() {
        let line = status_line(
            HostStatus {
                sync_enabled: true,
                clients: 0,
            },
            URL,
        );
        assert_eq!(line, "sync ON | waiting for phone | connect to ws://192.168.43.1:9527");
    }

    #[test]
    fn test_status_line_paused_with_phones() {
        let line = status_line(
            HostStatus {
                sync_enabled: false,
                clients: 2,
            },
            URL,
        );
        assert!(line.contains("PAUSED"));
        assert!(line.contains("2 phones connected"));
    }

    #[test]
    fn test_execute_toggle_flips_hub() {
        // Arrange
        let hub = SessionHub::new(true);

        // Act
        let out = execute(ConsoleCommand::Toggle, &hub, URL);

        // Assert
        assert_eq!(out, "sync PAUSED");
        assert!(!hub.is_enabled());
    }

    #[test]
    fn test_execute_on_when_already_on_reports_unchanged() {
        let hub = SessionHub::new(true);
        assert_eq!(execute(ConsoleCommand::On, &hub, URL), "sync already ON");
        assert_eq!(execute(ConsoleCommand::Off, &hub, URL), "sync PAUSED");
    }

    #[test]
    fn test_execute_status_lists_connected_phones() {
        // Arrange
        let hub = SessionHub::new(true);
        let info = SessionInfo::new("192.168.43.20:40000".parse().unwrap());
        let (tx, _rx) = mpsc::unbounded_channel();
        hub.register(SessionHandle::new(info.clone(), tx), |enabled| {
            ServerMessage::Pong {
                sync_enabled: enabled,
            }
        })
        .unwrap();

        // Act
        let out = execute(ConsoleCommand::Status, &hub, URL);

        // Assert
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("1 phone connected"));
        assert_eq!(lines[1], format!("  phone 192.168.43.20:40000 ({})", info.id));
    }

    #[test]
    fn test_execute_status_without_phones_is_one_line() {
        let hub = SessionHub::new(true);
        assert_eq!(execute(ConsoleCommand::Status, &hub, URL).lines().count(), 1);
    }

    #[test]
    fn test_describe_change_reports_connect_and_pause() {
        let prev = HostStatus {
            sync_enabled: true,
            clients: 0,
        };
        let next = HostStatus {
            sync_enabled: false,
            clients: 1,
        };
        assert_eq!(
            describe_change(prev, next).as_deref(),
            Some("sync paused, 1 phone(s) connected")
        );
    }

    #[test]
    fn test_describe_change_none_when_equal() {
        let s = HostStatus {
            sync_enabled: true,
            clients: 3,
        };
        assert_eq!(describe_change(s, s), None);
    }

    #[test]
    fn test_forward_lines_sends_each_line_in_order() {
        // Arrange
        let (tx, mut rx) = mpsc::unbounded_channel();
        let input = std::io::Cursor::new("t\nstatus\nq\n");

        // Act
        let forwarded = forward_lines(input, &tx);

        // Assert
        assert_eq!(forwarded, 3);
        assert_eq!(rx.try_recv().unwrap(), "t");
        assert_eq!(rx.try_recv().unwrap(), "status");
        assert_eq!(rx.try_recv().unwrap(), "q");
    }

    #[test]
    fn test_forward_lines_stops_when_console_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let forwarded = forward_lines(std::io::Cursor::new("t\nt\n"), &tx);

        assert_eq!(forwarded, 0);
    }

    #[tokio::test]
    async fn test_report_status_ends_when_hub_dropped() {
        let hub = SessionHub::new(true);
        let rx = hub.subscribe();
        let task = tokio::spawn(report_status(rx));

        hub.toggle();
        drop(hub);

        assert!(timeout(Duration::from_secs(2), task).await.is_ok());
    }
}
