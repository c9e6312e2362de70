//! Consumer-facing connection callbacks.

/// Callbacks delivered by the link's worker tasks.
///
/// All three are invoked from background tasks. Implementations must hand
/// work off promptly (push to a channel, write to a non-blocking sink):
/// a callback that blocks stalls the read or write loop behind it.
pub trait LinkEvents: Send + Sync {
    /// A connection was established; `peer` is the remote address.
    fn on_connected(&self, peer: &str);

    /// The connection was lost. Fires at most once per connection,
    /// regardless of which worker observed the failure. Does not fire
    /// for an explicit `stop`.
    fn on_disconnected(&self);

    /// One successful transport read. Payload boundaries are whatever the
    /// transport returned per read; do not assume one remote write maps
    /// to one delivery.
    fn on_message(&self, payload: &[u8]);
}
