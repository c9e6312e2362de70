//! Link service: the connection arbitrator, reconnection loop and public API.
//!
//! `start` runs a persistent accept loop; `connect` runs a fixed-backoff
//! dial loop. Both funnel every obtained endpoint through one claim
//! operation guarded by the session mutex: the first endpoint wins and
//! becomes the duplex channel, any other is closed silently. A lost
//! connection re-enters listening on its own; redialing is a policy flag.

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::sleep;

use crate::channel::{run_reader, run_writer};
use crate::config::LinkConfig;
use crate::events::LinkEvents;
use crate::metrics::{LinkMetrics, MetricsSnapshot};
use crate::session::{LinkState, SessionInner};
use crate::transport::{Endpoint, Listener, Transport};

/// One logical duplex byte-stream session with a single peer.
///
/// Cheap to clone; all clones drive the same session. The service is
/// single-use: after [`stop`](LinkService::stop) it stays idle for good,
/// create a new service to come back up.
pub struct LinkService<T: Transport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> Clone for LinkService<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

pub(crate) struct Shared<T: Transport> {
    pub transport: T,
    pub config: LinkConfig,
    pub events: Arc<dyn LinkEvents>,
    pub metrics: Arc<LinkMetrics>,
    pub session: Mutex<SessionInner>,
    pub shutdown: watch::Sender<bool>,
}

impl<T: Transport> LinkService<T> {
    pub fn new(transport: T, config: LinkConfig, events: Arc<dyn LinkEvents>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                transport,
                config,
                events,
                metrics: Arc::new(LinkMetrics::new()),
                session: Mutex::new(SessionInner::new()),
                shutdown,
            }),
        }
    }

    /// Begin accepting inbound connections. Idempotent while the accept
    /// loop is running. Must be called inside a tokio runtime.
    pub fn start(&self) {
        spawn_listener(&self.shared);
        spawn_reporter(&self.shared);
    }

    /// Begin dialing `peer`, concurrently with any listening. Retries
    /// with a fixed backoff until some path connects or the service
    /// stops; one-shot per call once a connection is claimed. Must be
    /// called inside a tokio runtime.
    pub fn connect(&self, peer: &str) {
        {
            let mut inner = self.shared.session.lock().unwrap();
            if inner.stopped {
                return;
            }
            inner.last_peer = Some(peer.to_string());
            if matches!(inner.state, LinkState::Idle | LinkState::Listening) {
                inner.state = LinkState::Connecting;
            }
        }
        spawn_reporter(&self.shared);
        tokio::spawn(dial_loop(self.shared.clone(), peer.to_string()));
    }

    /// Enqueue a payload for the writer worker. Never blocks and never
    /// fails: while disconnected the payload is discarded, not retried.
    pub fn write(&self, payload: Vec<u8>) {
        let inner = self.shared.session.lock().unwrap();
        match &inner.queue {
            Some(queue) if inner.state == LinkState::Connected => queue.push(payload),
            _ => debug!("discarding {} byte payload, not connected", payload.len()),
        }
    }

    /// Cancel all loops, close any live endpoint and release the write
    /// queue. No `on_disconnected` fires for a stop.
    pub fn stop(&self) {
        self.shared.session.lock().unwrap().release();
        let _ = self.shared.shutdown.send(true);
        info!("link stopped");
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        self.shared.session.lock().unwrap().state
    }

    /// Sample the diagnostic counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }
}

fn spawn_listener<T: Transport>(shared: &Arc<Shared<T>>) {
    {
        let mut inner = shared.session.lock().unwrap();
        if inner.stopped || inner.accept_running {
            return;
        }
        inner.accept_running = true;
        if inner.state == LinkState::Idle {
            inner.state = LinkState::Listening;
        }
    }
    tokio::spawn(accept_loop(shared.clone()));
}

fn spawn_reporter<T: Transport>(shared: &Arc<Shared<T>>) {
    {
        let mut inner = shared.session.lock().unwrap();
        if inner.stopped || inner.reporter_running {
            return;
        }
        inner.reporter_running = true;
    }
    tokio::spawn(report_loop(shared.clone()));
}

/// Arbitration point shared by the accept and dial loops: decide under the
/// session mutex whether this endpoint becomes the live connection, then
/// notify and spawn the channel workers outside of it. A losing endpoint
/// is dropped here, which closes it.
fn claim<T: Transport>(shared: &Arc<Shared<T>>, endpoint: T::Endpoint, peer: &str) {
    let ticket = shared.session.lock().unwrap().try_claim();
    let Some(ticket) = ticket else {
        debug!("closing surplus connection from {peer}");
        return;
    };
    info!("connected to {peer}");
    shared.metrics.record_connect();
    shared.events.on_connected(peer);
    let (reader, writer) = endpoint.into_split();
    tokio::spawn(run_reader(
        shared.clone(),
        ticket.generation,
        reader,
        ticket.teardown.clone(),
    ));
    tokio::spawn(run_writer(
        shared.clone(),
        ticket.generation,
        writer,
        ticket.drain,
        ticket.teardown,
    ));
}

/// Idempotent disconnect path, entered by whichever worker observes the
/// failure first. Notifies once, re-enters listening, and redials the
/// last peer when the policy flag asks for it.
pub(crate) fn connection_lost<T: Transport>(shared: &Arc<Shared<T>>, generation: u64) {
    let redial = {
        let mut inner = shared.session.lock().unwrap();
        if !inner.try_disconnect(generation) {
            return;
        }
        if !inner.stopped && shared.config.redial_on_drop {
            inner.last_peer.clone()
        } else {
            None
        }
    };
    info!("connection lost");
    shared.metrics.record_disconnect();
    shared.events.on_disconnected();
    spawn_listener(shared);
    if let Some(peer) = redial {
        info!("redialing {peer}");
        tokio::spawn(dial_loop(shared.clone(), peer));
    }
}

async fn accept_loop<T: Transport>(shared: Arc<Shared<T>>) {
    let mut shutdown = shared.shutdown.subscribe();
    'bind: loop {
        if *shutdown.borrow() {
            break;
        }
        let mut listener = tokio::select! {
            biased;
            _ = shutdown.changed() => break 'bind,
            bound = shared.transport.bind() => match bound {
                Ok(listener) => listener,
                Err(e) => {
                    warn!("listen failed: {e}");
                    tokio::select! {
                        biased;
                        _ = shutdown.changed() => break 'bind,
                        _ = sleep(shared.config.listen_retry) => {}
                    }
                    continue 'bind;
                }
            },
        };
        debug!("listening for inbound connections");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break 'bind,
                accepted = listener.accept() => match accepted {
                    Ok((endpoint, peer)) => {
                        debug!("accepted connection from {peer}");
                        claim(&shared, endpoint, &peer);
                    }
                    Err(e) => {
                        warn!("accept failed: {e}");
                        tokio::select! {
                            biased;
                            _ = shutdown.changed() => break 'bind,
                            _ = sleep(shared.config.listen_retry) => {}
                        }
                        continue 'bind;
                    }
                },
            }
        }
    }
    shared.session.lock().unwrap().accept_running = false;
}

async fn dial_loop<T: Transport>(shared: Arc<Shared<T>>, peer: String) {
    let mut shutdown = shared.shutdown.subscribe();
    info!("dialing {peer}");
    loop {
        {
            let inner = shared.session.lock().unwrap();
            if inner.stopped || inner.state == LinkState::Connected {
                break;
            }
        }
        if *shutdown.borrow() {
            break;
        }
        let dialed = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            dialed = shared.transport.connect(&peer) => dialed,
        };
        match dialed {
            Ok(endpoint) => {
                claim(&shared, endpoint, &peer);
                break;
            }
            Err(e) => {
                debug!(
                    "dial to {peer} failed: {e}, retrying in {:?}",
                    shared.config.dial_backoff
                );
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    _ = sleep(shared.config.dial_backoff) => {}
                }
            }
        }
    }
}

async fn report_loop<T: Transport>(shared: Arc<Shared<T>>) {
    let mut shutdown = shared.shutdown.subscribe();
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = sleep(shared.config.report_interval) => {
                let m = shared.metrics.snapshot();
                debug!(
                    "link stats: {} bytes in, {} bytes out, {} connects, {} disconnects",
                    m.bytes_read, m.bytes_written, m.connects, m.disconnects
                );
            }
        }
    }
}
