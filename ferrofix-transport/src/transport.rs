/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 2/8/26
******************************************************************************/

//! Byte transport seam.
//!
//! The connection engine speaks to the network through [`Transport`]: a
//! duplex byte channel with read, write and close. [`IoTransport`] adapts
//! any `AsyncRead + AsyncWrite` stream (TCP sockets, TLS wrappers, in-memory
//! duplex pipes in tests) to that seam.

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Duplex byte channel used by the connection engine.
#[async_trait]
pub trait Transport: Send {
    /// Reads available bytes into `buf`, returning the count. Zero means the
    /// peer closed the stream.
    ///
    /// # Errors
    /// Underlying I/O failures.
    async fn read_buf(&mut self, buf: &mut BytesMut) -> std::io::Result<usize>;

    /// Writes the whole buffer.
    ///
    /// # Errors
    /// Underlying I/O failures.
    async fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()>;

    /// Flushes and shuts the stream down. Errors on close are ignored; the
    /// connection is gone either way.
    async fn close(&mut self);
}

/// [`Transport`] over any tokio byte stream.
#[derive(Debug)]
pub struct IoTransport<S> {
    stream: S,
}

impl<S> IoTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps a connected stream.
    #[must_use]
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Returns the wrapped stream.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl IoTransport<TcpStream> {
    /// Connects a TCP stream with `TCP_NODELAY` set.
    ///
    /// # Errors
    /// Connection failures.
    pub async fn connect(addr: impl ToSocketAddrs + Send) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}

#[async_trait]
impl<S> Transport for IoTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_buf(&mut self, buf: &mut BytesMut) -> std::io::Result<usize> {
        self.stream.read_buf(buf).await
    }

    async fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }

    async fn close(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}
