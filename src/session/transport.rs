//! Transport seam for the recognition session
//!
//! The session state machine is written against [`Transport`] so the
//! reconnect policy can be exercised without a live service. The production
//! implementation is a WebSocket client.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::{Error, Result};

/// A message received from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMessage {
    /// Structured text payload
    Text(String),
    /// Raw binary payload
    Binary(Vec<u8>),
}

/// Connector for duplex connections to the recognition service
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a connection, bounded by `timeout`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] if the connection cannot be established
    /// within the timeout.
    async fn connect(&self, url: &str, timeout: Duration) -> Result<Box<dyn TransportConn>>;
}

/// One established duplex connection
#[async_trait]
pub trait TransportConn: Send {
    /// Send a structured text message
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] on transmit failure.
    async fn send_text(&mut self, text: &str) -> Result<()>;

    /// Send a raw binary message
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] on transmit failure.
    async fn send_binary(&mut self, payload: Vec<u8>) -> Result<()>;

    /// Receive the next message; `None` once the peer has closed
    async fn recv(&mut self) -> Option<Result<TransportMessage>>;

    /// Close the connection with a normal-closure handshake
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] if the close handshake fails.
    async fn close(&mut self) -> Result<()>;
}

/// WebSocket transport backed by `tokio-tungstenite`
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str, timeout: Duration) -> Result<Box<dyn TransportConn>> {
        let connect = tokio_tungstenite::connect_async(url);
        let (socket, _response) = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| Error::Session(format!("connect to {url} timed out")))?
            .map_err(|e| Error::Session(format!("connect to {url} failed: {e}")))?;

        Ok(Box::new(WsConn { socket }))
    }
}

struct WsConn {
    socket: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
}

#[async_trait]
impl TransportConn for WsConn {
    async fn send_text(&mut self, text: &str) -> Result<()> {
        self.socket
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| Error::Session(format!("text send failed: {e}")))
    }

    async fn send_binary(&mut self, payload: Vec<u8>) -> Result<()> {
        self.socket
            .send(Message::Binary(payload))
            .await
            .map_err(|e| Error::Session(format!("binary send failed: {e}")))
    }

    async fn recv(&mut self) -> Option<Result<TransportMessage>> {
        loop {
            return match self.socket.next().await? {
                Ok(Message::Text(text)) => Some(Ok(TransportMessage::Text(text))),
                Ok(Message::Binary(payload)) => Some(Ok(TransportMessage::Binary(payload))),
                // Control frames are transport plumbing, not session input.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "peer closed connection");
                    None
                }
                Err(e) => Some(Err(Error::Session(format!("receive failed: {e}")))),
            };
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.socket
            .close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "session closed".into(),
            }))
            .await
            .map_err(|e| Error::Session(format!("close failed: {e}")))
    }
}
