//! RelayClient against a scripted in-process host.
//!
//! Each test starts a tiny WebSocket server that plays a fixed script, so the
//! client's waiting, skipping and timeout behaviour can be checked without
//! the real host (and without typing anything on the test machine).

use std::future::Future;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_test::{assert_err, assert_ok};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

use voicecoding_client::{ClientError, RelayClient, TextOutcome};
use voicecoding_core::{decode_message, encode_server_message, ClientMessage, ServerMessage};

const TIMEOUT: Duration = Duration::from_secs(2);

type HostWs = WebSocketStream<TcpStream>;

/// Starts a one-connection host running `script` and returns its URL.
async fn scripted_host<F, Fut>(script: F) -> String
where
    F: FnOnce(HostWs) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        script(ws).await;
    });
    format!("ws://{addr}")
}

async fn send(ws: &mut HostWs, msg: ServerMessage) {
    let json = encode_server_message(&msg).unwrap();
    ws.send(Message::Text(json)).await.unwrap();
}

async fn recv(ws: &mut HostWs) -> ClientMessage {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return decode_message(&text).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("client went away: {other:?}"),
        }
    }
}

fn welcome(sync_enabled: bool) -> ServerMessage {
    ServerMessage::Connected {
        message: "Connected to Voice Coding server".to_string(),
        sync_enabled,
        host_name: "scripted".to_string(),
    }
}

/// Keeps the socket open until the client hangs up.
async fn drain(ws: &mut HostWs) {
    while let Some(Ok(_)) = ws.next().await {}
}

// ── Connect ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_returns_welcome() {
    // Arrange
    let url = scripted_host(|mut ws| async move {
        send(&mut ws, welcome(false)).await;
        drain(&mut ws).await;
    })
    .await;

    // Act
    let client = assert_ok!(RelayClient::connect(&url, TIMEOUT).await);

    // Assert
    assert_eq!(client.welcome().host_name, "scripted");
    assert!(!client.welcome().sync_enabled);
    assert!(!client.sync_enabled());
}

#[tokio::test]
async fn test_connect_rejects_non_welcome_first_message() {
    let url = scripted_host(|mut ws| async move {
        send(&mut ws, ServerMessage::Pong { sync_enabled: true }).await;
        drain(&mut ws).await;
    })
    .await;

    let result = RelayClient::connect(&url, TIMEOUT).await;

    match result {
        Err(ClientError::UnexpectedMessage(kind)) => assert_eq!(kind, "pong"),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("connect should fail"),
    }
}

#[tokio::test]
async fn test_connect_times_out_without_welcome() {
    let url = scripted_host(|mut ws| async move {
        drain(&mut ws).await;
    })
    .await;

    let result = RelayClient::connect(&url, Duration::from_millis(300)).await;

    assert!(matches!(result, Err(ClientError::Timeout)));
}

// ── Text ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_send_text_skips_interleaved_sync_state() {
    // Arrange: the host broadcasts a sync change before acking.
    let url = scripted_host(|mut ws| async move {
        send(&mut ws, welcome(true)).await;
        assert_eq!(recv(&mut ws).await, ClientMessage::text("hello"));
        send(
            &mut ws,
            ServerMessage::SyncState {
                sync_enabled: false,
            },
        )
        .await;
        send(
            &mut ws,
            ServerMessage::Ack {
                message: "Text received and typed".to_string(),
            },
        )
        .await;
        drain(&mut ws).await;
    })
    .await;
    let mut client = RelayClient::connect(&url, TIMEOUT).await.unwrap();

    // Act
    let outcome = assert_ok!(client.send_text("hello").await);

    // Assert
    assert_eq!(outcome, TextOutcome::Acked);
    assert!(!client.sync_enabled(), "broadcast must still be recorded");
}

#[tokio::test]
async fn test_send_text_reports_sync_disabled_and_failure() {
    let url = scripted_host(|mut ws| async move {
        send(&mut ws, welcome(true)).await;
        recv(&mut ws).await;
        send(
            &mut ws,
            ServerMessage::SyncDisabled {
                message: "paused".to_string(),
            },
        )
        .await;
        recv(&mut ws).await;
        send(
            &mut ws,
            ServerMessage::Error {
                message: "clipboard error: no display".to_string(),
            },
        )
        .await;
        drain(&mut ws).await;
    })
    .await;
    let mut client = RelayClient::connect(&url, TIMEOUT).await.unwrap();

    assert_eq!(
        client.send_text("one").await.unwrap(),
        TextOutcome::SyncDisabled
    );
    assert_eq!(
        client.send_text("two").await.unwrap(),
        TextOutcome::Failed("clipboard error: no display".to_string())
    );
}

#[tokio::test]
async fn test_send_text_times_out_when_host_is_silent() {
    let url = scripted_host(|mut ws| async move {
        send(&mut ws, welcome(true)).await;
        drain(&mut ws).await;
    })
    .await;
    let mut client = RelayClient::connect(&url, Duration::from_millis(300))
        .await
        .unwrap();

    let err = assert_err!(client.send_text("").await);

    assert!(matches!(err, ClientError::Timeout));
}

// ── Ping, shadow, events ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_ping_returns_flag_and_shadow_frames_are_encoded() {
    // Arrange
    let url = scripted_host(|mut ws| async move {
        send(&mut ws, welcome(true)).await;
        assert_eq!(recv(&mut ws).await, ClientMessage::shadow_full_sync(""));
        assert_eq!(
            recv(&mut ws).await,
            ClientMessage::shadow_replace(4, "word")
        );
        assert_eq!(recv(&mut ws).await, ClientMessage::Ping);
        send(
            &mut ws,
            ServerMessage::Pong {
                sync_enabled: false,
            },
        )
        .await;
        drain(&mut ws).await;
    })
    .await;
    let mut client = RelayClient::connect(&url, TIMEOUT).await.unwrap();

    // Act
    assert_ok!(client.shadow_full_sync("").await);
    assert_ok!(client.shadow_replace(4, "word").await);
    let enabled = assert_ok!(client.ping().await);

    // Assert
    assert!(!enabled);
    assert!(!client.sync_enabled());
}

#[tokio::test]
async fn test_try_next_event_reports_silence_then_broadcast() {
    let (go_tx, go_rx) = tokio::sync::oneshot::channel::<()>();
    let url = scripted_host(|mut ws| async move {
        send(&mut ws, welcome(true)).await;
        let _ = go_rx.await;
        send(
            &mut ws,
            ServerMessage::SyncState {
                sync_enabled: false,
            },
        )
        .await;
        drain(&mut ws).await;
    })
    .await;
    let mut client = RelayClient::connect(&url, TIMEOUT).await.unwrap();

    let quiet = assert_ok!(client.try_next_event(Duration::from_millis(100)).await);
    assert_eq!(quiet, None);

    go_tx.send(()).unwrap();
    let event = assert_ok!(client.next_event().await);
    assert_eq!(
        event,
        ServerMessage::SyncState {
            sync_enabled: false
        }
    );
}

#[tokio::test]
async fn test_next_event_after_host_hangs_up_is_closed() {
    let url = scripted_host(|mut ws| async move {
        send(&mut ws, welcome(true)).await;
        let _ = ws.close(None).await;
    })
    .await;
    let mut client = RelayClient::connect(&url, TIMEOUT).await.unwrap();

    let err = assert_err!(client.next_event().await);

    assert!(matches!(err, ClientError::Closed), "got {err:?}");
}

#[tokio::test]
async fn test_close_completes_against_live_host() {
    let url = scripted_host(|mut ws| async move {
        send(&mut ws, welcome(true)).await;
        drain(&mut ws).await;
    })
    .await;
    let client = RelayClient::connect(&url, TIMEOUT).await.unwrap();

    assert_ok!(client.close().await);
}
