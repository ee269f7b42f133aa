//! Client-side transport abstraction.
//!
//! Admin tools and test harnesses talk to the game server through these
//! traits, so the JSON message layer does not care which socket
//! implementation carries the text frames.

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors that can occur while talking to the game server.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// An I/O or protocol-level error.
    #[error("{0}")]
    Io(String),

    /// A frame could not be encoded or decoded as a protocol message.
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read half of a connection: yields one text frame per message.
pub trait TransportReader: Send + 'static {
    /// Receive the next text frame.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(&mut self) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;
}

/// Write half of a connection.
pub trait TransportWriter: Send + 'static {
    /// Send one text frame.
    fn send(&mut self, text: &str) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// A bidirectional connection that can be split so reading and writing
/// happen in separate tasks.
pub trait Transport: Send + 'static {
    type Reader: TransportReader;
    type Writer: TransportWriter;

    fn split(self) -> (Self::Reader, Self::Writer);
}

/// Encode `msg` as JSON and send it as a single frame.
pub async fn send_message<W, M>(writer: &mut W, msg: &M) -> Result<(), TransportError>
where
    W: TransportWriter,
    M: Serialize,
{
    let text = serde_json::to_string(msg)?;
    writer.send(&text).await
}

/// Receive the next frame and decode it as `M`.
///
/// A clean close surfaces as [`TransportError::ConnectionClosed`].
pub async fn recv_message<R, M>(reader: &mut R) -> Result<M, TransportError>
where
    R: TransportReader,
    M: DeserializeOwned,
{
    match reader.recv().await? {
        Some(text) => Ok(serde_json::from_str(&text)?),
        None => Err(TransportError::ConnectionClosed),
    }
}
