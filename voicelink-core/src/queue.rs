//! Outbound write queue: unbounded, order-preserving, one per connection.

use tokio::sync::mpsc;

/// Producer half of the write queue. Held by the service for the lifetime
/// of one connection; dropping it releases the queue so the writer worker
/// drains out and exits.
#[derive(Debug)]
pub struct WriteQueue {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

/// Consumer half, owned by the writer worker of the same connection.
#[derive(Debug)]
pub struct WriteQueueDrain {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl WriteQueue {
    /// Create a fresh queue pair for a new connection.
    pub fn new() -> (WriteQueue, WriteQueueDrain) {
        let (tx, rx) = mpsc::unbounded_channel();
        (WriteQueue { tx }, WriteQueueDrain { rx })
    }

    /// Enqueue a payload. Never blocks. A push after the drain is gone is
    /// a silent drop; the connection is already being torn down.
    pub fn push(&self, payload: Vec<u8>) {
        let _ = self.tx.send(payload);
    }
}

impl WriteQueueDrain {
    /// Wait for the next payload. Returns `None` once the producer half is
    /// dropped and the queue is empty.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_order() {
        let (q, mut drain) = WriteQueue::new();
        q.push(b"one".to_vec());
        q.push(b"two".to_vec());
        q.push(b"three".to_vec());
        assert_eq!(drain.recv().await.unwrap(), b"one");
        assert_eq!(drain.recv().await.unwrap(), b"two");
        assert_eq!(drain.recv().await.unwrap(), b"three");
    }

    #[tokio::test]
    async fn recv_ends_after_release() {
        let (q, mut drain) = WriteQueue::new();
        q.push(b"last".to_vec());
        drop(q);
        assert_eq!(drain.recv().await.unwrap(), b"last");
        assert!(drain.recv().await.is_none());
    }

    #[tokio::test]
    async fn push_after_drain_gone_is_silent() {
        let (q, drain) = WriteQueue::new();
        drop(drain);
        q.push(b"nobody home".to_vec());
    }
}
