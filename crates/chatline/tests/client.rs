//! Integration tests for `ChatClient` against a real WebSocket server.

use std::time::Duration;

use chatline::prelude::*;
use chatline_protocol::{EnvelopeCodec, WireEnvelope};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

const WAIT: Duration = Duration::from_secs(5);

// =========================================================================
// Helpers
// =========================================================================

async fn start_server() -> (String, mpsc::UnboundedReceiver<ServerWs>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let url = format!("ws://{}", listener.local_addr().expect("should have addr"));
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
                let _ = tx.send(ws);
            }
        }
    });
    (url, rx)
}

fn alice() -> Identity {
    Identity {
        sender_id: SenderId::from("alice-id"),
        display_name: "alice".into(),
    }
}

async fn next_envelope(server: &mut ServerWs) -> WireEnvelope {
    let frame = timeout(WAIT, server.next())
        .await
        .expect("frame should arrive")
        .expect("stream open")
        .expect("frame ok");
    serde_json::from_slice(&frame.into_data()).expect("valid envelope")
}

async fn connected_client() -> (ChatClient, ServerWs) {
    let (url, mut accepted) = start_server().await;
    let client = ChatClient::builder(alice())
        .url(url)
        .room("lobby")
        .build(WebSocketConnector::new());
    client.connect().await.expect("should connect");
    let server = timeout(WAIT, accepted.recv()).await.unwrap().unwrap();
    (client, server)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_join_chat_leave_reach_server_in_order() {
    let (client, mut server) = connected_client().await;

    client.join();
    client.send_chat("  hello <world>  ").unwrap();
    client.leave();

    let join = next_envelope(&mut server).await;
    assert_eq!(join.kind, MessageKind::Join);
    assert_eq!(join.payload.sender_id, SenderId::from("alice-id"));
    assert_eq!(join.payload.room_id, RoomId::from("lobby"));

    let chat = next_envelope(&mut server).await;
    assert_eq!(chat.kind, MessageKind::Chat);
    assert_eq!(chat.payload.content, "hello world");
    assert_eq!(chat.payload.sender_display_name, "alice");
    assert!(chat.payload.sent_at_epoch_millis > 0);

    let leave = next_envelope(&mut server).await;
    assert_eq!(leave.kind, MessageKind::Leave);

    client.disconnect();
}

#[tokio::test]
async fn test_close_delivers_leave_before_socket_closes() {
    let (client, mut server) = connected_client().await;

    client.leave();
    timeout(WAIT, client.close()).await.expect("close should finish");
    assert_eq!(client.status(), ConnectionStatus::Idle);

    let leave = next_envelope(&mut server).await;
    assert_eq!(leave.kind, MessageKind::Leave);
    let after = timeout(WAIT, server.next()).await.expect("close frame should arrive");
    assert!(matches!(after, Some(Ok(Message::Close(_))) | None));
}

#[tokio::test]
async fn test_invalid_chat_is_rejected_and_not_sent() {
    let (client, mut server) = connected_client().await;

    assert!(matches!(
        client.send_chat("   "),
        Err(ChatlineError::InvalidMessage(ContentError::Empty))
    ));
    assert!(matches!(
        client.send_chat(&"x".repeat(501)),
        Err(ChatlineError::InvalidMessage(ContentError::TooLong { .. }))
    ));
    assert!(matches!(
        client.send_chat("<><>"),
        Err(ChatlineError::InvalidMessage(ContentError::Empty))
    ));

    // The next frame the server sees is the valid one.
    client.send_chat("ok").unwrap();
    assert_eq!(next_envelope(&mut server).await.payload.content, "ok");

    client.disconnect();
}

#[tokio::test]
async fn test_room_observer_filters_other_rooms() {
    let (client, mut server) = connected_client().await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on_room_message(move |m| {
        let _ = tx.send(m.content.clone());
    });

    let codec = EnvelopeCodec::json();
    for (room, text) in [("elsewhere", "skip me"), ("lobby", "for lobby")] {
        let msg = DomainMessage::chat(SenderId::from("bob-id"), "bob", RoomId::from(room), text);
        let bytes = codec.encode(&msg, 5).unwrap();
        server.send(Message::Binary(bytes.into())).await.unwrap();
    }

    let received = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(received, "for lobby");
    assert!(rx.try_recv().is_err());

    client.disconnect();
}

#[tokio::test]
async fn test_send_chat_while_disconnected_is_dropped() {
    let (url, _accepted) = start_server().await;
    let client = ChatClient::builder(alice())
        .url(url)
        .build(WebSocketConnector::new());

    assert!(!client.is_connected());
    assert_eq!(client.status(), ConnectionStatus::Idle);
    client.send_chat("nobody hears this").unwrap();
    assert_eq!(client.room(), &RoomId::from(DEFAULT_ROOM));
}

#[tokio::test]
async fn test_status_observer_sees_connect_and_disconnect() {
    let (url, _accepted) = start_server().await;
    let client = ChatClient::builder(alice())
        .url(url)
        .build(WebSocketConnector::new());

    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on_connection_change(move |s| {
        let _ = tx.send(s);
    });

    client.connect().await.unwrap();
    assert_eq!(rx.recv().await, Some(ConnectionStatus::Connected));

    client.disconnect();
    assert_eq!(
        timeout(WAIT, rx.recv()).await.unwrap(),
        Some(ConnectionStatus::Disconnected)
    );
}
