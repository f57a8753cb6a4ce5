//! Line-delimited JSON-RPC transport.
//!
//! Stratum v1 is newline-delimited JSON over TCP. The [`Transport`] trait
//! abstracts message I/O so the session logic can run over TCP in
//! production and over channels in tests.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::tracing::prelude::*;

use super::error::{StratumError, StratumResult};
use super::messages::JsonRpcMessage;

/// Message-level I/O for the Stratum protocol.
#[async_trait]
pub trait Transport: Send {
    /// Read one complete message. Returns `None` on clean connection close.
    async fn read_message(&mut self) -> StratumResult<Option<JsonRpcMessage>>;

    /// Write one message.
    async fn write_message(&mut self, message: &JsonRpcMessage) -> StratumResult<()>;
}

/// Buffered TCP transport.
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    line: String,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            line: String::with_capacity(4096),
        }
    }

    /// Connect to a pool.
    ///
    /// Accepts `stratum+tcp://host:port`, `tcp://host:port`, or a bare
    /// `host:port`.
    pub async fn connect(url: &str) -> StratumResult<Self> {
        let address = url
            .strip_prefix("stratum+tcp://")
            .or_else(|| url.strip_prefix("tcp://"))
            .unwrap_or(url);

        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| StratumError::ConnectionFailed(e.to_string()))?;
        debug!("Connected to {address}");

        Ok(Self::new(stream))
    }
}

#[async_trait]
impl Transport for Connection {
    async fn read_message(&mut self) -> StratumResult<Option<JsonRpcMessage>> {
        loop {
            self.line.clear();
            let n = self.reader.read_line(&mut self.line).await?;
            if n == 0 {
                return Ok(None);
            }

            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }
            trace!(rx = %line, "Received");

            let message = serde_json::from_str(line)
                .map_err(|e| StratumError::InvalidMessage(format!("{e}, line: {line}")))?;
            return Ok(Some(message));
        }
    }

    async fn write_message(&mut self, message: &JsonRpcMessage) -> StratumResult<()> {
        let mut json = serde_json::to_string(message)?;
        trace!(tx = %json, "Sending");
        json.push('\n');

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Channel-backed transport for deterministic tests.
///
/// Create a linked pair with [`MockTransport::pair`]; the transport is the
/// session's side, the handle is the test's side.
#[cfg(test)]
pub(crate) struct MockTransport {
    rx: tokio::sync::mpsc::UnboundedReceiver<JsonRpcMessage>,
    tx: tokio::sync::mpsc::UnboundedSender<JsonRpcMessage>,
}

#[cfg(test)]
pub(crate) struct MockTransportHandle {
    tx: tokio::sync::mpsc::UnboundedSender<JsonRpcMessage>,
    rx: tokio::sync::mpsc::UnboundedReceiver<JsonRpcMessage>,
}

#[cfg(test)]
impl MockTransport {
    pub fn pair() -> (Self, MockTransportHandle) {
        let (session_tx, handle_rx) = tokio::sync::mpsc::unbounded_channel();
        let (handle_tx, session_rx) = tokio::sync::mpsc::unbounded_channel();
        (
            MockTransport {
                rx: session_rx,
                tx: session_tx,
            },
            MockTransportHandle {
                tx: handle_tx,
                rx: handle_rx,
            },
        )
    }
}

#[cfg(test)]
#[async_trait]
impl Transport for MockTransport {
    async fn read_message(&mut self) -> StratumResult<Option<JsonRpcMessage>> {
        Ok(self.rx.recv().await)
    }

    async fn write_message(&mut self, message: &JsonRpcMessage) -> StratumResult<()> {
        self.tx
            .send(message.clone())
            .map_err(|_| StratumError::Disconnected)
    }
}

#[cfg(test)]
impl MockTransportHandle {
    /// Feed a message to the session.
    pub fn send(&self, message: JsonRpcMessage) {
        self.tx.send(message).expect("transport dropped");
    }

    /// Read a message the session wrote.
    pub async fn recv(&mut self) -> JsonRpcMessage {
        self.rx.recv().await.expect("transport dropped")
    }

    /// Read a message without waiting, `None` if the session wrote nothing.
    pub fn try_recv(&mut self) -> Option<JsonRpcMessage> {
        self.rx.try_recv().ok()
    }
}
