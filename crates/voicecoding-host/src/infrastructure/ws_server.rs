//! WebSocket server: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming TCP connections from phones.
//! 3. Upgrading each connection to a WebSocket session within the handshake
//!    timeout.
//! 4. Queuing the `connected` welcome and registering the session with the
//!    [`SessionHub`].
//! 5. Running two concurrent tasks per session:
//!    - **Reader**: reads frames, decodes them, and hands each message to the
//!      [`InjectionPolicy`] on the blocking pool.  One message at a time, in
//!      arrival order.
//!    - **Writer**: drains the session's send queue onto the socket and sends
//!      a WebSocket ping every keepalive interval.
//! 6. Unregistering the session as soon as either task ends.  When the
//!    phone closes normally the writer is left to flush what is queued and
//!    answer the close handshake; on errors it is aborted.
//! 7. Gracefully shutting down when the `running` flag is cleared.
//!
//! # Dead peers
//!
//! A phone that sends nothing for `idle_timeout` is dropped.  Healthy phones
//! answer the writer's pings with pongs, which count as inbound frames.  A
//! single frame write that takes longer than `send_timeout` also ends the
//! session.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{anyhow, Context};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{error::ProtocolError, Error as WsError, Message as WsMessage},
    WebSocketStream,
};
use tracing::{debug, error, info, warn};

use voicecoding_core::{decode_message, encode_server_message, ServerMessage, SessionId};

use crate::application::{InjectionPolicy, Session, SessionHandle, SessionHub, TextSurface};
use crate::domain::HostConfig;

type WsSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// How often the accept loop wakes up to check the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

// ── Server context ────────────────────────────────────────────────────────────

/// Everything a session task needs, shared behind one `Arc`.
pub struct ServerContext {
    config: HostConfig,
    hub: Arc<SessionHub>,
    policy: InjectionPolicy,
}

impl ServerContext {
    /// Builds the hub (seeded from `config.sync_enabled_on_start`) and the
    /// injection policy over `surface`.
    pub fn new(config: HostConfig, surface: Arc<dyn TextSurface>) -> Self {
        let hub = Arc::new(SessionHub::new(config.sync_enabled_on_start));
        let policy = InjectionPolicy::new(surface, Arc::clone(&hub));
        Self {
            config,
            hub,
            policy,
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// The shared hub, for the console toggle and status observers.
    pub fn hub(&self) -> Arc<SessionHub> {
        Arc::clone(&self.hub)
    }

    fn welcome(&self, sync_enabled: bool) -> ServerMessage {
        ServerMessage::Connected {
            message: self.config.welcome_message.clone(),
            sync_enabled,
            host_name: self.config.host_name.clone(),
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the WebSocket listener.
///
/// # Errors
///
/// Returns an error if the address is in use or the process lacks
/// permission.  This is the only startup failure that stops the host.
pub async fn bind_listener(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {addr}"))
}

/// Binds `ctx.config().bind_addr` and runs [`serve`] until `running` is
/// cleared.
///
/// # Errors
///
/// Returns an error only if the listener cannot be bound.
pub async fn run_server(ctx: Arc<ServerContext>, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = bind_listener(ctx.config.bind_addr).await?;
    serve(listener, ctx, running).await
}

/// Runs the accept loop on an already-bound listener until `running` is set
/// to `false`.
///
/// Each accepted connection gets its own Tokio task, so one slow phone never
/// blocks another.
///
/// # Errors
///
/// Accept errors are logged and skipped; this function currently always
/// returns `Ok(())`.
pub async fn serve(
    listener: TcpListener,
    ctx: Arc<ServerContext>,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    match listener.local_addr() {
        Ok(addr) => info!("VoiceCoding host listening on ws://{addr}"),
        Err(e) => warn!("listener has no local address: {e}"),
    }

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short timeout so the flag is re-checked even when nobody connects.
        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new connection from {peer_addr}");
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, ctx).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g. out of file descriptors); keep serving.
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }

    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, ctx: Arc<ServerContext>) {
    match run_session(stream, peer_addr, ctx).await {
        Ok(id) => info!(session = %id, "session {peer_addr} closed"),
        Err(e) => warn!("session {peer_addr} ended with error: {e:#}"),
    }
}

/// Runs the whole lifecycle of one phone connection and returns its id.
///
/// # Errors
///
/// Returns an error if the handshake fails or times out, or if the welcome
/// cannot be queued.  Errors after registration end the session but are
/// logged rather than returned.
async fn run_session(
    raw_stream: TcpStream,
    peer_addr: SocketAddr,
    ctx: Arc<ServerContext>,
) -> anyhow::Result<SessionId> {
    // ── Step 1: Handshake (Connecting) ─────────────────────────────────────
    let ws_stream = timeout(ctx.config.handshake_timeout, accept_async(raw_stream))
        .await
        .map_err(|_| anyhow!("WebSocket handshake with {peer_addr} timed out"))?
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    // ── Step 2: Open, welcome, register ────────────────────────────────────
    let mut session = Session::new(peer_addr);
    session.open()?;
    let id = session.id();
    let outbound = session.take_outbound();
    let handle = session.handle();

    ctx.hub.register(handle.clone(), |enabled| ctx.welcome(enabled))?;
    info!(session = %id, "phone connected from {peer_addr} ({} total)", ctx.hub.count());

    // ── Step 3: Reader and writer ──────────────────────────────────────────
    let (ws_tx, ws_rx) = ws_stream.split();

    let mut writer_task = tokio::spawn(write_loop(
        ws_tx,
        outbound,
        id,
        ctx.config.keepalive_interval,
        ctx.config.send_timeout,
    ));
    let mut reader_task = tokio::spawn(read_loop(ws_rx, handle, Arc::clone(&ctx)));

    // Whichever side finishes first ends the session.  Only a clean reader
    // end leaves the writer running.
    let flush_writer = tokio::select! {
        res = &mut reader_task => {
            let clean = matches!(res, Ok(Ok(())));
            if !clean {
                writer_task.abort();
            }
            log_task_end(id, "reader", res);
            clean
        }
        res = &mut writer_task => {
            reader_task.abort();
            log_task_end(id, "writer", res);
            false
        }
    };

    // ── Step 4: Closed ─────────────────────────────────────────────────────
    // Closing refuses new messages; unregistering and dropping the session
    // release the last senders, so the writer's queue ends once drained.
    session.close();
    ctx.hub.unregister(id);
    drop(session);
    info!(session = %id, "phone disconnected ({} remaining)", ctx.hub.count());

    if flush_writer {
        match timeout(ctx.config.send_timeout, &mut writer_task).await {
            Ok(res) => log_task_end(id, "writer", res),
            Err(_) => {
                writer_task.abort();
                debug!(
                    session = %id,
                    "writer did not finish closing within {:?}",
                    ctx.config.send_timeout
                );
            }
        }
    }

    Ok(id)
}

fn log_task_end(
    id: SessionId,
    which: &str,
    res: Result<anyhow::Result<()>, tokio::task::JoinError>,
) {
    match res {
        Ok(Ok(())) => debug!(session = %id, "{which} finished"),
        Ok(Err(e)) => debug!(session = %id, "{which} stopped: {e:#}"),
        Err(e) => error!(session = %id, "{which} task failed: {e}"),
    }
}

// ── Reader ────────────────────────────────────────────────────────────────────

async fn read_loop(
    mut ws_rx: WsSource,
    handle: SessionHandle,
    ctx: Arc<ServerContext>,
) -> anyhow::Result<()> {
    let id = handle.id();
    let idle_timeout = ctx.config.idle_timeout;

    loop {
        let frame = match timeout(idle_timeout, ws_rx.next()).await {
            Err(_) => {
                return Err(anyhow!("no frame from phone within {idle_timeout:?}"));
            }
            Ok(None) => {
                debug!(session = %id, "stream ended");
                return Ok(());
            }
            Ok(Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed))) => {
                debug!(session = %id, "connection closed");
                return Ok(());
            }
            Ok(Some(Err(e))) => return Err(e).context("WebSocket read failed"),
            Ok(Some(Ok(frame))) => frame,
        };

        let raw = match frame {
            WsMessage::Text(text) => text,
            WsMessage::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    warn!(session = %id, "dropping non-UTF-8 binary frame");
                    continue;
                }
            },
            WsMessage::Ping(_) | WsMessage::Pong(_) => {
                // tungstenite queues the pong reply itself.
                continue;
            }
            WsMessage::Close(_) => {
                debug!(session = %id, "close frame received");
                return Ok(());
            }
            WsMessage::Frame(_) => continue,
        };

        if let Some(reply) = process_frame(id, raw, &ctx).await {
            if handle.send(reply).is_err() {
                return Err(anyhow!("send queue closed"));
            }
        }
    }
}

/// Decodes one frame and applies it, returning the reply to queue.
///
/// Injection may block on the clipboard-settle delay, so it runs on the
/// blocking pool.  The reader awaits it before reading the next frame, which
/// keeps one session's messages in order.
async fn process_frame(id: SessionId, raw: String, ctx: &Arc<ServerContext>) -> Option<ServerMessage> {
    let msg = match decode_message(&raw) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(session = %id, "dropping frame ({} bytes): {e}", raw.len());
            return None;
        }
    };
    debug!(session = %id, kind = msg.kind(), "received message");

    let ctx = Arc::clone(ctx);
    match tokio::task::spawn_blocking(move || ctx.policy.handle(&msg)).await {
        Ok(reply) => reply,
        Err(e) => {
            error!(session = %id, "injection task failed: {e}");
            None
        }
    }
}

// ── Writer ────────────────────────────────────────────────────────────────────

async fn write_loop(
    mut ws_tx: WsSink,
    mut outbound: mpsc::UnboundedReceiver<ServerMessage>,
    id: SessionId,
    keepalive: Duration,
    send_timeout: Duration,
) -> anyhow::Result<()> {
    let mut ticker = interval(keepalive);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; the phone was just welcomed.
    ticker.tick().await;

    loop {
        let frame = tokio::select! {
            maybe = outbound.recv() => match maybe {
                Some(msg) => {
                    debug!(session = %id, kind = msg.kind(), "sending message");
                    WsMessage::Text(encode_server_message(&msg)?)
                }
                None => {
                    debug!(session = %id, "send queue closed");
                    let _ = timeout(send_timeout, ws_tx.close()).await;
                    return Ok(());
                }
            },
            _ = ticker.tick() => WsMessage::Ping(Vec::new()),
        };

        match timeout(send_timeout, ws_tx.send(frame)).await {
            Err(_) => return Err(anyhow!("send timed out after {send_timeout:?}")),
            Ok(Ok(())) => {}
            // The phone already sent its close frame; only the close reply
            // may go out now.
            Ok(Err(WsError::Protocol(ProtocolError::SendAfterClosing))) => {
                debug!(session = %id, "phone is closing; dropping queued messages");
                let _ = timeout(send_timeout, ws_tx.close()).await;
                return Ok(());
            }
            Ok(Err(e)) => return Err(e).context("WebSocket send failed"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
