use tracing::{debug, info, warn};

use crate::{
    db::{now_millis, Room},
    hub::ClientConnection,
    protocol::{ErrorScope, NewRoomRequest, Outbound},
};

use super::Relay;

impl Relay {
    pub(crate) async fn create_room(
        &self,
        conn: &ClientConnection,
        NewRoomRequest { room_name, uid, password }: NewRoomRequest,
    ) -> anyhow::Result<()> {
        if room_name.is_empty() || uid.is_empty() {
            return Ok(());
        }

        let password = match password.filter(|p| !p.is_empty()) {
            Some(password) => Some(self.hasher.hash(&password).await?),
            None => None,
        };
        let room = Room {
            name: room_name,
            password,
            created_by: uid,
            created_at: now_millis(),
        };

        if !self.rooms.create_room(&room).await? {
            debug!(room = %room.name, uid = %room.created_by, "room name taken");
            self.hub.send_to(conn, &Outbound::error(ErrorScope::Create, "Room already exists"));
            return Ok(());
        }

        info!(room = %room.name, uid = %room.created_by, protected = room.is_protected(), "room created");
        // The room exists now; a failed fan-out must not hide that from the creator.
        if let Err(e) = self.hub.broadcast_room_list().await {
            warn!(room = %room.name, error = %e, "room list broadcast failed after create");
        }
        self.hub.send_to(conn, &Outbound::CreateSuccess { room_name: room.name });
        Ok(())
    }
}
