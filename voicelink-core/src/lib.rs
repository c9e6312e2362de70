//! voicelink protocol core: one resilient duplex byte-stream session between two peers.
//!
//! Races an inbound listener against an outbound dialer for the same logical peer,
//! runs the winning connection through independent reader/writer workers, detects
//! disconnection exactly once, and re-enters listening after a drop. The transport
//! is injected behind narrow capability traits (see [`transport`]); a TCP
//! implementation and an in-process [`mem`] implementation ship with the crate.

pub mod config;
pub mod events;
pub mod mem;
pub mod metrics;
pub mod queue;
pub mod service;
pub mod transport;

mod channel;
mod session;

pub use config::LinkConfig;
pub use events::LinkEvents;
pub use mem::{MemoryHub, MemoryTransport};
pub use metrics::{LinkMetrics, MetricsSnapshot};
pub use queue::{WriteQueue, WriteQueueDrain};
pub use service::LinkService;
pub use session::LinkState;
pub use transport::{Endpoint, EndpointReader, EndpointWriter, Listener, TcpTransport, Transport};
