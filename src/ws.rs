//! WebSocket plumbing.
//!
//! Thin wrapper around `tokio-tungstenite` providing type-isolated
//! reader/writer halves, plus the chat endpoint URL builder. The transport
//! session reaches the socket only through these types (via the
//! [`crate::transport::Connector`] seam).

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;

use crate::constants;
use crate::protocol::RoomId;

/// Concrete WebSocket stream type.
type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Received WebSocket message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsMessage {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
    /// Ping frame with payload.
    Ping(Vec<u8>),
    /// Pong frame with payload.
    Pong(Vec<u8>),
    /// Close frame with status code and reason.
    Close {
        /// WebSocket close code (1000 = normal, 1005 = no code).
        code: u16,
        /// Human-readable close reason.
        reason: String,
    },
}

/// Write half of a WebSocket connection.
#[derive(Debug)]
pub struct WsWriter {
    sink: futures_util::stream::SplitSink<WsStream, tungstenite::Message>,
}

impl WsWriter {
    /// Send a UTF-8 text frame.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Text(text.to_string()))
            .await
            .context("WebSocket send_text failed")
    }

    /// Send a pong frame in response to a ping.
    pub async fn send_pong(&mut self, data: Vec<u8>) -> Result<()> {
        self.sink
            .send(tungstenite::Message::Pong(data))
            .await
            .context("WebSocket send_pong failed")
    }

    /// Send a close frame and flush the sink.
    pub async fn close(&mut self) -> Result<()> {
        self.sink.close().await.context("WebSocket close failed")
    }
}

/// Read half of a WebSocket connection.
#[derive(Debug)]
pub struct WsReader {
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WsReader {
    /// Receive the next message, returning `None` when the stream ends.
    ///
    /// Raw `Frame` variants are skipped internally.
    pub async fn recv(&mut self) -> Option<Result<WsMessage>> {
        loop {
            let msg = match self.stream.next().await? {
                Ok(tungstenite::Message::Text(text)) => WsMessage::Text(text.to_string()),
                Ok(tungstenite::Message::Binary(data)) => WsMessage::Binary(data.to_vec()),
                Ok(tungstenite::Message::Ping(data)) => WsMessage::Ping(data.to_vec()),
                Ok(tungstenite::Message::Pong(data)) => WsMessage::Pong(data.to_vec()),
                Ok(tungstenite::Message::Close(close_frame)) => {
                    let (code, reason) = close_frame
                        .map(|cf| (cf.code.into(), cf.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    WsMessage::Close { code, reason }
                }
                Ok(tungstenite::Message::Frame(_)) => continue,
                Err(e) => return Some(Err(anyhow::anyhow!("WebSocket read error: {e}"))),
            };
            return Some(Ok(msg));
        }
    }
}

/// Perform the WebSocket handshake against `url`.
///
/// Returns split (writer, reader) halves for independent use in
/// `tokio::select!` loops.
pub async fn connect(url: &str) -> Result<(WsWriter, WsReader)> {
    use tungstenite::client::IntoClientRequest;

    let request = url
        .into_client_request()
        .with_context(|| format!("invalid WebSocket URL: {}", redact_token(url)))?;

    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .context("WebSocket connect failed")?;

    let (sink, stream) = ws_stream.split();

    Ok((WsWriter { sink }, WsReader { stream }))
}

/// Convert an HTTP(S) URL to WS(S) scheme.
///
/// Passes `ws://` and `wss://` through unchanged.
#[must_use]
pub fn http_to_ws_scheme(url: &str) -> String {
    if url.starts_with("wss://") || url.starts_with("ws://") {
        url.to_string()
    } else {
        url.replace("https://", "wss://")
            .replace("http://", "ws://")
    }
}

/// Chat socket URL for `room`: `scheme://host/ws/chat?roomId=<id>&token=<token>`.
///
/// The scheme follows the server base URL, so an `https` server is reached
/// over `wss`.
#[must_use]
pub fn chat_url(server_url: &str, room: RoomId, token: &str) -> String {
    format!(
        "{}{}?roomId={}&token={}",
        http_to_ws_scheme(server_url.trim_end_matches('/')),
        constants::WS_CHAT_PATH,
        room,
        token
    )
}

/// URL with the `token` query value masked, for log lines.
#[must_use]
pub fn redact_token(url: &str) -> String {
    match url.find("token=") {
        Some(idx) => format!("{}token=***", &url[..idx]),
        None => url.to_string(),
    }
}
