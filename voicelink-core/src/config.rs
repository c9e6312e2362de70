//! Link behavior knobs: retry cadence, buffer sizing, redial policy.

use std::time::Duration;

/// Configuration for a [`crate::LinkService`].
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Delay between failed outbound dial attempts.
    pub dial_backoff: Duration,

    /// Delay before rebinding the listener after a bind or accept failure.
    pub listen_retry: Duration,

    /// Size of the reader worker's reusable buffer. One successful read
    /// of up to this many bytes becomes one message delivery.
    pub read_buffer_size: usize,

    /// How often the diagnostic reporter samples the byte counters.
    pub report_interval: Duration,

    /// Whether to resume dialing the last peer after a mid-session drop.
    /// When false, only the listener restarts; a fresh `connect` call is
    /// the caller's responsibility.
    pub redial_on_drop: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            dial_backoff: Duration::from_millis(3000),
            listen_retry: Duration::from_millis(1000),
            read_buffer_size: 8192,
            report_interval: Duration::from_millis(1000),
            redial_on_drop: false,
        }
    }
}
