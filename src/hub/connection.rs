use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

/// Handle to one socket's outbound queue. Holds no room membership; every
/// inbound action names its own room.
#[derive(Debug)]
pub struct ClientConnection {
    pub id: Uuid,
    tx: mpsc::Sender<Arc<String>>,
}

impl ClientConnection {
    pub fn new(id: Uuid, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self { id, tx }
    }

    /// Whether the socket's writer is still draining the queue.
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queues a serialized envelope. Returns `false` if the queue is full or
    /// the socket is gone.
    pub fn send(&self, message: Arc<String>) -> bool {
        self.tx.try_send(message).is_ok()
    }
}
