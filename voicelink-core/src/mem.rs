//! In-process transport over paired byte pipes.
//!
//! A [`MemoryHub`] is a tiny address registry: binding registers an inbox
//! under a name, dialing that name hands the listener one end of a fresh
//! duplex pipe. Used by the test suite and handy for wiring two link
//! services together inside one process.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc;

use crate::transport::{Endpoint, EndpointReader, EndpointWriter, Listener, Transport};

const PIPE_CAPACITY: usize = 64 * 1024;

type Inbox = mpsc::UnboundedSender<(MemoryEndpoint, String)>;

/// Shared registry of listening addresses.
#[derive(Debug, Clone, Default)]
pub struct MemoryHub {
    inner: Arc<Mutex<HashMap<String, Inbox>>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose listener binds `local` on this hub.
    pub fn transport(&self, local: impl Into<String>) -> MemoryTransport {
        MemoryTransport {
            hub: self.clone(),
            local: local.into(),
        }
    }
}

/// One endpoint's view of a [`MemoryHub`].
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    hub: MemoryHub,
    local: String,
}

/// Listener side: receives endpoints dialed at the bound address.
#[derive(Debug)]
pub struct MemoryListener {
    hub: MemoryHub,
    local: String,
    rx: mpsc::UnboundedReceiver<(MemoryEndpoint, String)>,
}

/// One end of an in-process duplex pipe. Dropping it makes the far end
/// read EOF and fail writes, like a closed socket.
#[derive(Debug)]
pub struct MemoryEndpoint {
    io: DuplexStream,
}

#[async_trait]
impl Transport for MemoryTransport {
    type Endpoint = MemoryEndpoint;
    type Listener = MemoryListener;

    async fn bind(&self) -> io::Result<MemoryListener> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut map = self.hub.inner.lock().unwrap();
        if map.contains_key(&self.local) {
            return Err(io::Error::new(
                io::ErrorKind::AddrInUse,
                format!("{} is already bound", self.local),
            ));
        }
        map.insert(self.local.clone(), tx);
        Ok(MemoryListener {
            hub: self.hub.clone(),
            local: self.local.clone(),
            rx,
        })
    }

    async fn connect(&self, peer: &str) -> io::Result<MemoryEndpoint> {
        let inbox = self.hub.inner.lock().unwrap().get(peer).cloned();
        let inbox = inbox.ok_or_else(|| {
            io::Error::new(io::ErrorKind::ConnectionRefused, format!("{peer} is not listening"))
        })?;
        let (ours, theirs) = tokio::io::duplex(PIPE_CAPACITY);
        inbox
            .send((MemoryEndpoint { io: theirs }, self.local.clone()))
            .map_err(|_| {
                io::Error::new(io::ErrorKind::ConnectionRefused, format!("{peer} stopped listening"))
            })?;
        Ok(MemoryEndpoint { io: ours })
    }
}

impl Drop for MemoryListener {
    fn drop(&mut self) {
        self.hub.inner.lock().unwrap().remove(&self.local);
    }
}

#[async_trait]
impl Listener for MemoryListener {
    type Endpoint = MemoryEndpoint;

    async fn accept(&mut self) -> io::Result<(MemoryEndpoint, String)> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "listener unregistered"))
    }
}

impl Endpoint for MemoryEndpoint {
    type Reader = ReadHalf<DuplexStream>;
    type Writer = WriteHalf<DuplexStream>;

    fn into_split(self) -> (ReadHalf<DuplexStream>, WriteHalf<DuplexStream>) {
        tokio::io::split(self.io)
    }
}

#[async_trait]
impl EndpointReader for ReadHalf<DuplexStream> {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        AsyncReadExt::read(self, buf).await
    }
}

#[async_trait]
impl EndpointWriter for WriteHalf<DuplexStream> {
    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        AsyncWriteExt::write_all(self, buf).await
    }
}
