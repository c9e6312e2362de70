//! Session state machine: every transition into or out of `Connected` goes
//! through [`SessionInner`] under one mutex, so the claim decision and the
//! disconnect decision can never interleave.

use tokio::sync::watch;

use crate::queue::{WriteQueue, WriteQueueDrain};

/// Externally observable link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Not listening, not dialing.
    Idle,
    /// Accept loop running, no live connection.
    Listening,
    /// Dial loop running, no live connection.
    Connecting,
    /// Exactly one live endpoint, workers running.
    Connected,
}

/// Handles for a freshly claimed connection, returned by a winning claim.
pub(crate) struct ClaimTicket {
    /// Identifies the connection; a disconnect for an older generation is
    /// ignored, so a stale worker can never tear down its successor.
    pub generation: u64,
    /// Consumer half of the connection's write queue.
    pub drain: WriteQueueDrain,
    /// Fires when the connection is torn down; both workers exit on it.
    pub teardown: watch::Receiver<bool>,
}

pub(crate) struct SessionInner {
    pub state: LinkState,
    pub generation: u64,
    pub queue: Option<WriteQueue>,
    teardown: Option<watch::Sender<bool>>,
    /// Address given to the most recent `connect` call, for redial.
    pub last_peer: Option<String>,
    pub accept_running: bool,
    pub reporter_running: bool,
    pub stopped: bool,
}

impl SessionInner {
    pub fn new() -> Self {
        Self {
            state: LinkState::Idle,
            generation: 0,
            queue: None,
            teardown: None,
            last_peer: None,
            accept_running: false,
            reporter_running: false,
            stopped: false,
        }
    }

    /// Try to make a new endpoint the live connection. Returns `None` when
    /// the endpoint is surplus (already connected, or stopped): the caller
    /// closes it without any notification. First caller wins; listener and
    /// dialer get no priority over each other.
    pub fn try_claim(&mut self) -> Option<ClaimTicket> {
        if self.stopped || self.state == LinkState::Connected {
            return None;
        }
        self.generation += 1;
        let (queue, drain) = WriteQueue::new();
        let (teardown_tx, teardown_rx) = watch::channel(false);
        self.queue = Some(queue);
        self.teardown = Some(teardown_tx);
        self.state = LinkState::Connected;
        Some(ClaimTicket {
            generation: self.generation,
            drain,
            teardown: teardown_rx,
        })
    }

    /// Tear down connection `generation` if it is still the live one.
    /// Returns whether this call performed the transition; exactly one of
    /// any number of concurrent callers gets `true`, so the disconnect
    /// notification fires at most once per connection.
    pub fn try_disconnect(&mut self, generation: u64) -> bool {
        if self.state != LinkState::Connected || self.generation != generation {
            return false;
        }
        self.state = if self.stopped {
            LinkState::Idle
        } else {
            LinkState::Listening
        };
        self.queue = None;
        if let Some(teardown) = self.teardown.take() {
            let _ = teardown.send(true);
        }
        true
    }

    /// Shut the session down for good: no further claims succeed, the
    /// queue is released and any live connection is told to tear down.
    pub fn release(&mut self) {
        self.stopped = true;
        self.state = LinkState::Idle;
        self.queue = None;
        if let Some(teardown) = self.teardown.take() {
            let _ = teardown.send(true);
        }
    }
}
