//! Duplex channel workers: one reader and one writer task per live endpoint.
//!
//! Each worker owns its half of the endpoint. Either may observe the
//! connection failing first; both funnel into the idempotent disconnect
//! path and exit on the connection's teardown signal, dropping their
//! halves and thereby closing the endpoint.

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::watch;

use crate::queue::WriteQueueDrain;
use crate::service::{connection_lost, Shared};
use crate::transport::{Endpoint, EndpointReader, EndpointWriter, Transport};

/// Read loop: deliver every successful read to the consumer and count it.
pub(crate) async fn run_reader<T: Transport>(
    shared: Arc<Shared<T>>,
    generation: u64,
    mut reader: <T::Endpoint as Endpoint>::Reader,
    mut teardown: watch::Receiver<bool>,
) {
    let mut buf = vec![0u8; shared.config.read_buffer_size];
    loop {
        let read = tokio::select! {
            biased;
            _ = teardown.changed() => break,
            read = reader.read(&mut buf) => read,
        };
        match read {
            Ok(0) => {
                debug!("peer closed the connection");
                connection_lost(&shared, generation);
                break;
            }
            Ok(n) => {
                shared.metrics.add_read(n);
                shared.events.on_message(&buf[..n]);
            }
            Err(e) => {
                warn!("read failed: {e}");
                connection_lost(&shared, generation);
                break;
            }
        }
    }
}

/// Write loop: drain the connection's queue to the endpoint in FIFO order.
pub(crate) async fn run_writer<T: Transport>(
    shared: Arc<Shared<T>>,
    generation: u64,
    mut writer: <T::Endpoint as Endpoint>::Writer,
    mut drain: WriteQueueDrain,
    mut teardown: watch::Receiver<bool>,
) {
    loop {
        let payload = tokio::select! {
            biased;
            _ = teardown.changed() => break,
            payload = drain.recv() => match payload {
                Some(payload) => payload,
                None => break,
            },
        };
        let written = tokio::select! {
            biased;
            _ = teardown.changed() => break,
            written = writer.write_all(&payload) => written,
        };
        match written {
            Ok(()) => shared.metrics.add_written(payload.len()),
            Err(e) => {
                warn!("write failed: {e}");
                connection_lost(&shared, generation);
                break;
            }
        }
    }
}
