//! A single WebSocket connection to a VoiceCoding host.
//!
//! [`RelayClient`] owns the socket and performs request/response exchanges
//! one at a time (`&mut self`).  Unsolicited `sync_state` broadcasts that
//! arrive while waiting for a reply are absorbed: the client records the new
//! flag and keeps waiting.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};
use tracing::debug;

use voicecoding_core::{
    decode_server_message, encode_message, ClientMessage, ProtocolError, ServerMessage,
};

/// Errors that can occur while talking to the host.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The WebSocket connection failed or broke.
    #[error("WebSocket error: {0}")]
    Ws(#[from] WsError),

    /// No reply arrived within the configured timeout.
    #[error("timed out waiting for the host")]
    Timeout,

    /// The host closed the connection.
    #[error("connection closed by host")]
    Closed,

    /// The host sent a frame that is not a valid server message.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The host sent a valid message that does not answer the request.
    #[error("unexpected `{0}` message from host")]
    UnexpectedMessage(String),
}

/// The host's `connected` welcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Welcome {
    pub message: String,
    pub sync_enabled: bool,
    pub host_name: String,
}

/// How the host answered a `text` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOutcome {
    /// Typed at the cursor.
    Acked,
    /// The host has sync paused; nothing was typed.
    SyncDisabled,
    /// The host tried to type but its automation failed.
    Failed(String),
}

/// An open connection to a host.
pub struct RelayClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    timeout: Duration,
    welcome: Welcome,
    sync_enabled: bool,
}

impl RelayClient {
    /// Connects to `url` (e.g. `ws://192.168.43.1:9527`) and waits for the
    /// welcome.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Ws`] if the connection or handshake fails.
    /// - [`ClientError::Timeout`] if no welcome arrives within `timeout`.
    /// - [`ClientError::UnexpectedMessage`] if the first message is not
    ///   `connected`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let deadline = Instant::now() + timeout;
        let (ws, _response) = timeout_at(deadline, connect_async(url))
            .await
            .map_err(|_| ClientError::Timeout)??;
        debug!("connected to {url}");

        let mut client = Self {
            ws,
            timeout,
            welcome: Welcome {
                message: String::new(),
                sync_enabled: false,
                host_name: String::new(),
            },
            sync_enabled: false,
        };

        match client.recv_until(deadline).await? {
            ServerMessage::Connected {
                message,
                sync_enabled,
                host_name,
            } => {
                client.welcome = Welcome {
                    message,
                    sync_enabled,
                    host_name,
                };
                client.sync_enabled = sync_enabled;
                Ok(client)
            }
            other => Err(ClientError::UnexpectedMessage(other.kind().to_string())),
        }
    }

    pub fn welcome(&self) -> &Welcome {
        &self.welcome
    }

    /// The sync flag as last reported by the host (welcome, `pong` or
    /// `sync_state`).
    pub fn sync_enabled(&self) -> bool {
        self.sync_enabled
    }

    /// Sends `text` and waits for the host's verdict.
    ///
    /// The host does not answer empty text while sync is on, so sending `""`
    /// ends in [`ClientError::Timeout`].
    ///
    /// # Errors
    ///
    /// Connection errors, [`ClientError::Timeout`], or
    /// [`ClientError::UnexpectedMessage`] for any reply other than `ack`,
    /// `sync_disabled`, `error` or an interleaved `sync_state`.
    pub async fn send_text(&mut self, content: &str) -> Result<TextOutcome, ClientError> {
        self.send(&ClientMessage::text(content)).await?;
        let deadline = self.deadline();
        loop {
            match self.recv_until(deadline).await? {
                ServerMessage::Ack { .. } => return Ok(TextOutcome::Acked),
                ServerMessage::SyncDisabled { .. } => return Ok(TextOutcome::SyncDisabled),
                ServerMessage::Error { message } => return Ok(TextOutcome::Failed(message)),
                ServerMessage::SyncState { .. } => continue,
                other => return Err(ClientError::UnexpectedMessage(other.kind().to_string())),
            }
        }
    }

    /// Replaces the host's focused field with `content`.  No reply expected.
    pub async fn shadow_full_sync(&mut self, content: &str) -> Result<(), ClientError> {
        self.send(&ClientMessage::shadow_full_sync(content)).await
    }

    /// Deletes `delete_length` characters before the host's cursor, then
    /// types `content`.  No reply expected.
    pub async fn shadow_replace(
        &mut self,
        delete_length: u64,
        content: &str,
    ) -> Result<(), ClientError> {
        self.send(&ClientMessage::shadow_replace(delete_length, content))
            .await
    }

    /// Asks whether the host has sync enabled.
    ///
    /// Because the host handles one session's messages in order, a returned
    /// `pong` also means every message sent before it has been applied.
    pub async fn ping(&mut self) -> Result<bool, ClientError> {
        self.send(&ClientMessage::Ping).await?;
        let deadline = self.deadline();
        loop {
            match self.recv_until(deadline).await? {
                ServerMessage::Pong { sync_enabled } => return Ok(sync_enabled),
                ServerMessage::SyncState { .. } => continue,
                other => return Err(ClientError::UnexpectedMessage(other.kind().to_string())),
            }
        }
    }

    /// Sends a raw text frame, bypassing the codec.  Useful for legacy
    /// plain-text clients and for probing how the host handles bad input.
    pub async fn send_raw(&mut self, frame: impl Into<String>) -> Result<(), ClientError> {
        self.ws.send(WsMessage::Text(frame.into())).await?;
        Ok(())
    }

    /// Waits up to the configured timeout for the next message of any kind.
    ///
    /// # Errors
    ///
    /// [`ClientError::Timeout`] if nothing arrives.
    pub async fn next_event(&mut self) -> Result<ServerMessage, ClientError> {
        let deadline = self.deadline();
        self.recv_until(deadline).await
    }

    /// Like [`next_event`](Self::next_event) but waits `wait` and reports
    /// silence as `Ok(None)`.
    pub async fn try_next_event(
        &mut self,
        wait: Duration,
    ) -> Result<Option<ServerMessage>, ClientError> {
        match self.recv_until(Instant::now() + wait).await {
            Ok(msg) => Ok(Some(msg)),
            Err(ClientError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Sends a close frame and waits briefly for the host to acknowledge it.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.ws.close(None).await?;
        let deadline = self.deadline();
        // Drain until the host's close reply ends the stream.
        loop {
            match timeout_at(deadline, self.ws.next()).await {
                Err(_) | Ok(None) => return Ok(()),
                Ok(Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed))) => {
                    return Ok(())
                }
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(Some(Ok(_))) => continue,
            }
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }

    async fn send(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        debug!(kind = msg.kind(), "sending");
        self.ws.send(WsMessage::Text(encode_message(msg))).await?;
        Ok(())
    }

    /// Reads frames until a server message arrives or `deadline` passes.
    async fn recv_until(&mut self, deadline: Instant) -> Result<ServerMessage, ClientError> {
        loop {
            let frame = match timeout_at(deadline, self.ws.next()).await {
                Err(_) => return Err(ClientError::Timeout),
                Ok(None) => return Err(ClientError::Closed),
                Ok(Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed))) => {
                    return Err(ClientError::Closed)
                }
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(Some(Ok(frame))) => frame,
            };

            let raw = match frame {
                WsMessage::Text(text) => text,
                WsMessage::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => continue,
                },
                WsMessage::Close(_) => return Err(ClientError::Closed),
                // tungstenite answers pings itself.
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
            };

            let msg = decode_server_message(&raw)?;
            debug!(kind = msg.kind(), "received");
            match &msg {
                ServerMessage::Pong { sync_enabled } | ServerMessage::SyncState { sync_enabled } => {
                    self.sync_enabled = *sync_enabled;
                }
                _ => {}
            }
            return Ok(msg);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_readable() {
        assert_eq!(ClientError::Timeout.to_string(), "timed out waiting for the host");
        assert_eq!(
            ClientError::UnexpectedMessage("pong".to_string()).to_string(),
            "unexpected `pong` message from host"
        );
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        // Bind then drop to find a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = RelayClient::connect(&format!("ws://{addr}"), Duration::from_secs(2)).await;

        assert!(matches!(result, Err(ClientError::Ws(_))));
    }
}
