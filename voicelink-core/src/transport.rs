//! Transport capability traits and the TCP implementation.
//!
//! The core never touches a concrete socket type: it listens, dials, reads
//! and writes through these traits, so the platform transport is swappable
//! and the test suite runs against the in-process [`crate::mem`] transport.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

/// Factory for both sides of a connection: binds the inbound listener and
/// dials the remote peer. Cloned into the accept and dial loops.
#[async_trait]
pub trait Transport: Clone + Send + Sync + 'static {
    type Endpoint: Endpoint;
    type Listener: Listener<Endpoint = Self::Endpoint>;

    /// Open the inbound listener. Failures are retried by the caller.
    async fn bind(&self) -> io::Result<Self::Listener>;

    /// Dial `peer`. Failures are retried by the caller with backoff.
    async fn connect(&self, peer: &str) -> io::Result<Self::Endpoint>;
}

/// Inbound side of a [`Transport`]. Dropping it closes the listening socket,
/// which unblocks a pending accept as an I/O error.
#[async_trait]
pub trait Listener: Send + 'static {
    type Endpoint: Endpoint;

    /// Wait for one inbound connection; returns the endpoint and the
    /// remote address.
    async fn accept(&mut self) -> io::Result<(Self::Endpoint, String)>;
}

/// One live duplex connection. Ownership passes to the duplex channel on a
/// successful claim; a surplus endpoint is closed by drop.
pub trait Endpoint: Send + 'static {
    type Reader: EndpointReader;
    type Writer: EndpointWriter;

    /// Split into independently owned halves, one per worker. The
    /// underlying connection closes when both halves are dropped.
    fn into_split(self) -> (Self::Reader, Self::Writer);
}

/// Read half of an endpoint.
#[async_trait]
pub trait EndpointReader: Send + 'static {
    /// Read up to `buf.len()` bytes. `Ok(0)` means the peer closed the
    /// connection.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Write half of an endpoint.
#[async_trait]
pub trait EndpointWriter: Send + 'static {
    /// Write the whole buffer.
    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
}

/// TCP transport: listens on `bind_addr`, dials peers as `host:port`.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    bind_addr: std::net::SocketAddr,
}

impl TcpTransport {
    pub fn new(bind_addr: std::net::SocketAddr) -> Self {
        Self { bind_addr }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    type Endpoint = TcpStream;
    type Listener = TcpListener;

    async fn bind(&self) -> io::Result<TcpListener> {
        TcpListener::bind(self.bind_addr).await
    }

    async fn connect(&self, peer: &str) -> io::Result<TcpStream> {
        TcpStream::connect(peer).await
    }
}

#[async_trait]
impl Listener for TcpListener {
    type Endpoint = TcpStream;

    async fn accept(&mut self) -> io::Result<(TcpStream, String)> {
        let (stream, addr) = TcpListener::accept(&*self).await?;
        Ok((stream, addr.to_string()))
    }
}

impl Endpoint for TcpStream {
    type Reader = OwnedReadHalf;
    type Writer = OwnedWriteHalf;

    fn into_split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        TcpStream::into_split(self)
    }
}

#[async_trait]
impl EndpointReader for OwnedReadHalf {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        AsyncReadExt::read(self, buf).await
    }
}

#[async_trait]
impl EndpointWriter for OwnedWriteHalf {
    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        AsyncWriteExt::write_all(self, buf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tcp_roundtrip_through_traits() {
        let transport = TcpTransport::new("127.0.0.1:0".parse().unwrap());
        let mut listener = Transport::bind(&transport).await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let dialed = Transport::connect(&transport, &addr).await.unwrap();
        let (accepted, peer) = Listener::accept(&mut listener).await.unwrap();
        assert!(peer.starts_with("127.0.0.1:"));

        let (_dial_r, mut dial_w) = dialed.into_split();
        let (mut acc_r, _acc_w) = accepted.into_split();

        EndpointWriter::write_all(&mut dial_w, b"ping").await.unwrap();
        let mut buf = [0u8; 16];
        let n = EndpointReader::read(&mut acc_r, &mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ping");
    }
}
