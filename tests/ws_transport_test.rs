//! Transport session against a real loopback WebSocket server.
//!
//! Exercises the tungstenite connector end to end: URL construction, inbound
//! routing, outbound frames, and reconnect after a server-side close.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use roomchat::auth::{AuthSession, Credentials};
use roomchat::events::NoopListener;
use roomchat::transport::{ReconnectPolicy, TungsteniteConnector};
use roomchat::{ConnectionState, MessageKind, MessageRouter, RoomId, TransportSession};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

/// Server events reported to the test.
#[derive(Debug)]
enum ServerEvent {
    Handshake(String),
    Received(String),
}

/// Accept connections forever. Every connection is greeted with
/// `welcome-<n>`; the first one is closed by the server after the client
/// sends one frame.
async fn spawn_server() -> (String, mpsc::UnboundedReceiver<ServerEvent>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let connections = Arc::new(AtomicUsize::new(0));

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let events = events_tx.clone();
            let n = connections.fetch_add(1, Ordering::SeqCst) + 1;

            tokio::spawn(async move {
                let handshake_events = events.clone();
                let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    let _ = handshake_events.send(ServerEvent::Handshake(req.uri().to_string()));
                    Ok(resp)
                };
                let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback)
                    .await
                    .unwrap();

                let welcome = format!(r#"{{"type":0,"content":"welcome-{n}"}}"#);
                ws.send(Message::Text(welcome)).await.unwrap();

                while let Some(Ok(msg)) = ws.next().await {
                    if let Message::Text(text) = msg {
                        let _ = events.send(ServerEvent::Received(text.to_string()));
                        if n == 1 {
                            let _ = ws.close(None).await;
                            break;
                        }
                    }
                }
            });
        }
    });

    (format!("http://{addr}"), events_rx)
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<ServerEvent>) -> ServerEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for server")
        .expect("server stopped")
}

async fn wait_for_state(session: &TransportSession, state: ConnectionState) {
    timeout(WAIT, async {
        while session.state() != state {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("timed out waiting for state");
}

#[tokio::test]
async fn test_transport_round_trip_and_reconnect() {
    let (server_url, mut events) = spawn_server().await;

    let (routed_tx, mut routed_rx) = mpsc::unbounded_channel();
    let mut router = MessageRouter::new();
    router.register(MessageKind::Text, move |message| {
        let _ = routed_tx.send(message.content.clone());
    });

    let auth = Arc::new(AuthSession::in_memory(Credentials {
        token: Some("T".to_string()),
        user: None,
    }));
    let session = TransportSession::new(
        &server_url,
        auth,
        Arc::new(TungsteniteConnector),
        router,
        Arc::new(NoopListener),
        ReconnectPolicy {
            delay: Duration::from_millis(50),
            max_attempts: 5,
        },
    );

    session.connect(RoomId(5));

    match next_event(&mut events).await {
        ServerEvent::Handshake(uri) => assert_eq!(uri, "/ws/chat?roomId=5&token=T"),
        other => panic!("expected handshake, got {other:?}"),
    }
    let routed = timeout(WAIT, routed_rx.recv()).await.unwrap().unwrap();
    assert_eq!(routed, "welcome-1");
    wait_for_state(&session, ConnectionState::Open).await;

    session.send_text("hello").unwrap();
    match next_event(&mut events).await {
        ServerEvent::Received(text) => {
            let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(frame, serde_json::json!({"type": 0, "content": "hello", "roomId": 5}));
        }
        other => panic!("expected frame, got {other:?}"),
    }

    // The server closed the first connection; the session comes back on its own.
    match next_event(&mut events).await {
        ServerEvent::Handshake(uri) => assert!(uri.contains("roomId=5")),
        other => panic!("expected reconnect handshake, got {other:?}"),
    }
    let routed = timeout(WAIT, routed_rx.recv()).await.unwrap().unwrap();
    assert_eq!(routed, "welcome-2");
    wait_for_state(&session, ConnectionState::Open).await;
    assert_eq!(session.reconnect_attempts(), 0);

    session.close();
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_unreachable_server_exhausts_attempts() {
    // Bind and drop to get a port nobody listens on.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let session = TransportSession::new(
        &format!("http://{addr}"),
        Arc::new(AuthSession::in_memory(Credentials::default())),
        Arc::new(TungsteniteConnector),
        MessageRouter::new(),
        Arc::new(NoopListener),
        ReconnectPolicy {
            delay: Duration::from_millis(10),
            max_attempts: 2,
        },
    );

    session.connect(RoomId(1));
    wait_for_state(&session, ConnectionState::ClosedFinal).await;
    assert_eq!(session.reconnect_attempts(), 2);
}
