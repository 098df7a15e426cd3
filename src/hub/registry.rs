use std::{collections::HashMap, sync::Arc};

use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::ClientConnection;

/// The set of open sockets, owned by the process and shared by handle.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<Uuid, Arc<ClientConnection>>>,
    queue_size: usize,
}

impl ConnectionRegistry {
    pub fn new(queue_size: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            queue_size: queue_size.max(1),
        }
    }

    /// Registers a new connection and hands back the receiving end of its
    /// outbound queue.
    pub async fn open(&self) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(self.queue_size);
        let connection = Arc::new(ClientConnection::new(Uuid::now_v7(), tx));
        let mut conns = self.connections.write().await;
        let _ = conns.insert(connection.id, connection.clone());
        debug!(conn_id = %connection.id, open = conns.len(), "connection registered");
        (connection, rx)
    }

    pub async fn close(&self, id: Uuid) {
        let mut conns = self.connections.write().await;
        if conns.remove(&id).is_some() {
            debug!(conn_id = %id, open = conns.len(), "connection removed");
        }
    }

    pub async fn snapshot(&self) -> Vec<Arc<ClientConnection>> {
        self.connections.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
