use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    db::{RoomRepository, StoreError},
    protocol::{Outbound, RoomSummary},
};

use super::{ClientConnection, ConnectionRegistry};

/// Delivery of outbound envelopes. Best-effort: closed or backed-up
/// connections are skipped, never retried.
#[derive(Clone)]
pub struct BroadcastHub {
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<dyn RoomRepository>,
}

fn encode(event: &Outbound) -> Option<Arc<String>> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Arc::new(json)),
        Err(e) => {
            warn!(error = %e, "failed to serialize event");
            None
        }
    }
}

impl BroadcastHub {
    pub fn new(registry: Arc<ConnectionRegistry>, rooms: Arc<dyn RoomRepository>) -> Self {
        Self { registry, rooms }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Pushes the current room list to every open connection.
    pub async fn broadcast_room_list(&self) -> Result<usize, StoreError> {
        let rooms = self.rooms.list_rooms().await?;
        let rooms = rooms.iter().map(RoomSummary::from).collect();
        Ok(self.broadcast_to_all(&Outbound::RoomsUpdated { rooms }).await)
    }

    /// Returns how many connections accepted the envelope.
    pub async fn broadcast_to_all(&self, event: &Outbound) -> usize {
        let Some(json) = encode(event) else {
            return 0;
        };

        let conns = self.registry.snapshot().await;
        let mut delivered = 0;
        for conn in conns.iter().filter(|c| c.is_open()) {
            if conn.send(json.clone()) {
                delivered += 1;
            } else {
                warn!(conn_id = %conn.id, "failed to send event to client");
            }
        }
        debug!(recipients = delivered, open = conns.len(), "broadcast event to all");
        delivered
    }

    pub fn send_to(&self, conn: &ClientConnection, event: &Outbound) -> bool {
        if !conn.is_open() {
            return false;
        }
        let Some(json) = encode(event) else {
            return false;
        };
        let sent = conn.send(json);
        if !sent {
            warn!(conn_id = %conn.id, "failed to send event to client");
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        db::{Room, SqliteStore},
        protocol::ErrorScope,
    };

    async fn hub() -> (BroadcastHub, SqliteStore) {
        let store = SqliteStore::in_memory().await.unwrap();
        let hub = BroadcastHub::new(Arc::new(ConnectionRegistry::new(8)), Arc::new(store.clone()));
        (hub, store)
    }

    fn next_json(rx: &mut mpsc::Receiver<Arc<String>>) -> serde_json::Value {
        let raw = rx.try_recv().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn broadcast_skips_closed_connections() {
        let (hub, _store) = hub().await;
        let (_a, mut rx_a) = hub.registry().open().await;
        let (_b, rx_b) = hub.registry().open().await;
        drop(rx_b);

        let delivered = hub.broadcast_to_all(&Outbound::DeleteSuccess).await;

        assert_eq!(delivered, 1);
        assert_eq!(next_json(&mut rx_a)["type"], "delete-success");
    }

    #[tokio::test]
    async fn send_to_reaches_only_that_connection() {
        let (hub, _store) = hub().await;
        let (a, mut rx_a) = hub.registry().open().await;
        let (_b, mut rx_b) = hub.registry().open().await;

        assert!(hub.send_to(&a, &Outbound::error(ErrorScope::General, "nope")));

        assert_eq!(next_json(&mut rx_a)["message"], "nope");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn room_list_reflects_repository() {
        let (hub, store) = hub().await;
        let (_a, mut rx_a) = hub.registry().open().await;
        store
            .create_room(&Room {
                name: "lobby".into(),
                password: None,
                created_by: "u1".into(),
                created_at: 1,
            })
            .await
            .unwrap();

        assert_eq!(hub.broadcast_room_list().await.unwrap(), 1);

        let event = next_json(&mut rx_a);
        assert_eq!(event["type"], "rooms-updated");
        assert_eq!(event["rooms"][0]["name"], "lobby");
        assert_eq!(event["rooms"][0]["hasPassword"], false);
    }
}
