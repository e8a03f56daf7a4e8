//! Socket factory seam.
//!
//! The transport session opens sockets through a [`Connector`] and talks to
//! them through [`FrameSink`]/[`FrameSource`]. Production uses
//! [`TungsteniteConnector`]; tests script connection outcomes with an
//! in-memory connector.

use anyhow::Result;
use async_trait::async_trait;

use crate::ws::{self, WsMessage, WsReader, WsWriter};

/// Outgoing half of an open socket.
#[async_trait]
pub trait FrameSink: Send {
    /// Send a text frame.
    async fn send_text(&mut self, text: &str) -> Result<()>;

    /// Answer a ping.
    async fn send_pong(&mut self, data: Vec<u8>) -> Result<()>;

    /// Close the socket gracefully.
    async fn close(&mut self) -> Result<()>;
}

/// Incoming half of an open socket.
#[async_trait]
pub trait FrameSource: Send {
    /// Next message; `None` once the stream has ended.
    async fn recv(&mut self) -> Option<Result<WsMessage>>;
}

/// Boxed socket halves returned by a [`Connector`].
pub type SocketPair = (Box<dyn FrameSink>, Box<dyn FrameSource>);

/// Opens sockets.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Perform the handshake against `url`.
    async fn connect(&self, url: &str) -> Result<SocketPair>;
}

/// [`Connector`] backed by `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<SocketPair> {
        let (writer, reader) = ws::connect(url).await?;
        Ok((Box::new(writer), Box::new(reader)))
    }
}

#[async_trait]
impl FrameSink for WsWriter {
    async fn send_text(&mut self, text: &str) -> Result<()> {
        WsWriter::send_text(self, text).await
    }

    async fn send_pong(&mut self, data: Vec<u8>) -> Result<()> {
        WsWriter::send_pong(self, data).await
    }

    async fn close(&mut self) -> Result<()> {
        WsWriter::close(self).await
    }
}

#[async_trait]
impl FrameSource for WsReader {
    async fn recv(&mut self) -> Option<Result<WsMessage>> {
        WsReader::recv(self).await
    }
}
