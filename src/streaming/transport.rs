//! Client transports for stream sessions

use bytes::Bytes;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::{EdgeCamError, Result};

/// Write side of a client connection
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Write one chunk; any error, including a timeout, means the client is gone
    async fn write(&mut self, chunk: Bytes) -> Result<()>;

    /// Whether the client is known to be gone without attempting a write
    ///
    /// Transports that only find out by writing keep the default.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Transport feeding an HTTP response body through a bounded channel
///
/// The channel holds a single chunk, so a slow client backs the session up
/// instead of letting frames pile up in memory.
pub struct ChannelTransport {
    tx: mpsc::Sender<std::io::Result<Bytes>>,
    send_timeout: Duration,
}

impl ChannelTransport {
    pub const CAPACITY: usize = 1;

    /// Create the transport and the receiver the response body drains
    pub fn new(send_timeout: Duration) -> (Self, mpsc::Receiver<std::io::Result<Bytes>>) {
        let (tx, rx) = mpsc::channel(Self::CAPACITY);
        (Self { tx, send_timeout }, rx)
    }
}

#[async_trait::async_trait]
impl Transport for ChannelTransport {
    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        match tokio::time::timeout(self.send_timeout, self.tx.send(Ok(chunk))).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(EdgeCamError::transport_closed("response body dropped")),
            Err(_) => Err(EdgeCamError::Timeout { duration: self.send_timeout }),
        }
    }

    /// True once the response body, and with it the receiver, was dropped
    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Transport writing straight into a byte sink such as a TCP stream
pub struct IoTransport<W> {
    writer: W,
    send_timeout: Duration,
}

impl<W> IoTransport<W> {
    pub fn new(writer: W, send_timeout: Duration) -> Self {
        Self { writer, send_timeout }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait::async_trait]
impl<W> Transport for IoTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        match tokio::time::timeout(self.send_timeout, self.writer.write_all(&chunk)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(EdgeCamError::transport_closed_with_source("write failed", Box::new(e))),
            Err(_) => Err(EdgeCamError::Timeout { duration: self.send_timeout }),
        }
    }
}
