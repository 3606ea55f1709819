//! End-to-end channel tests over a real WebSocket server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chatline_channel::{Channel, ConnectionStatus, RetryPolicy};
use chatline_protocol::{DomainMessage, EnvelopeCodec, MessageKind, RoomId, SenderId, WireEnvelope};
use chatline_transport::WebSocketConnector;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

const WAIT: Duration = Duration::from_secs(5);

/// Binds a server that hands every accepted client to the returned queue.
async fn serve() -> (String, mpsc::UnboundedReceiver<ServerWs>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let url = format!("ws://{}", listener.local_addr().expect("should have addr"));
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
                if tx.send(ws).is_err() {
                    break;
                }
            }
        }
    });
    (url, rx)
}

fn short_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        delay: Duration::from_millis(50),
    }
}

fn greeting() -> DomainMessage {
    DomainMessage::chat(
        SenderId::from("server"),
        "bob",
        RoomId::from("general"),
        "welcome",
    )
}

#[tokio::test]
async fn test_channel_exchanges_messages_with_server() {
    let (url, mut clients) = serve().await;
    let channel = Channel::builder()
        .url(&url)
        .build(WebSocketConnector::new());

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    channel.on_message(move |m| {
        let _ = seen_tx.send(m.clone());
    });

    channel.connect().await.expect("should connect");
    let mut server = timeout(WAIT, clients.recv()).await.unwrap().unwrap();

    // Server to client.
    let bytes = EnvelopeCodec::json().encode(&greeting(), 42).unwrap();
    server
        .send(Message::Text(String::from_utf8(bytes).unwrap().into()))
        .await
        .unwrap();
    let received = timeout(WAIT, seen_rx.recv()).await.unwrap().unwrap();
    assert_eq!(received.content, "welcome");
    assert_eq!(received.sent_at_epoch_millis, 42);

    // Client to server.
    channel.send_message(DomainMessage::join(
        SenderId::from("user-1"),
        "alice",
        RoomId::from("general"),
    ));
    let frame = timeout(WAIT, server.next()).await.unwrap().unwrap().unwrap();
    let envelope: WireEnvelope = serde_json::from_slice(&frame.into_data()).unwrap();
    assert_eq!(envelope.kind, MessageKind::Join);
    assert_eq!(envelope.payload.sender_display_name, "alice");

    channel.disconnect();
}

#[tokio::test]
async fn test_channel_reconnects_after_server_drops_client() {
    let (url, mut clients) = serve().await;
    let channel = Channel::builder()
        .url(&url)
        .retry_policy(short_retry())
        .build(WebSocketConnector::new());

    let statuses = Arc::new(Mutex::new(Vec::new()));
    channel.on_connection_change({
        let statuses = statuses.clone();
        move |s| statuses.lock().unwrap().push(s)
    });

    channel.connect().await.expect("should connect");
    let mut first = timeout(WAIT, clients.recv()).await.unwrap().unwrap();
    first.close(None).await.unwrap();

    let _second = timeout(WAIT, clients.recv()).await.unwrap().unwrap();
    let status = timeout(WAIT, channel.wait_for_status(|s| s.is_connected()))
        .await
        .unwrap();
    assert_eq!(status, Some(ConnectionStatus::Connected));
    assert_eq!(channel.retry_attempts(), 0);

    assert_eq!(
        *statuses.lock().unwrap(),
        vec![
            ConnectionStatus::Connected,
            ConnectionStatus::Disconnected,
            ConnectionStatus::Connected,
        ]
    );

    channel.disconnect();
}

#[tokio::test]
async fn test_connect_to_dead_endpoint_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let channel = Channel::builder()
        .url(&url)
        .retry_policy(short_retry())
        .build(WebSocketConnector::new());

    let err = channel.connect().await.expect_err("nothing is listening");
    assert!(err.to_string().contains(&url));
    assert_eq!(channel.status(), ConnectionStatus::Error);
}
