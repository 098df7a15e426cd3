use tracing::{debug, info};

use crate::{
    hub::ClientConnection,
    protocol::{DeleteRoomRequest, ErrorScope, JoinRoomRequest, Outbound},
};

use super::Relay;

impl Relay {
    pub(crate) async fn join_room(
        &self,
        conn: &ClientConnection,
        JoinRoomRequest { room_name, password }: JoinRoomRequest,
    ) -> anyhow::Result<()> {
        let Some(room) = self.rooms.get_room(&room_name).await? else {
            self.hub.send_to(conn, &Outbound::error(ErrorScope::Join, "Room not found"));
            return Ok(());
        };

        if let Some(hash) = &room.password {
            let supplied = password.unwrap_or_default();
            if !self.hasher.verify(&supplied, hash).await? {
                debug!(room = %room.name, conn_id = %conn.id, "wrong room password");
                self.hub.send_to(conn, &Outbound::error(ErrorScope::Join, "Incorrect password"));
                return Ok(());
            }
        }

        let messages = self.rooms.list_messages(&room.name).await?;
        debug!(room = %room.name, conn_id = %conn.id, messages = messages.len(), "joined room");
        self.hub.send_to(conn, &Outbound::JoinSuccess { room_name: room.name, messages });
        Ok(())
    }

    pub(crate) async fn delete_room(
        &self,
        conn: &ClientConnection,
        DeleteRoomRequest { room_name, uid }: DeleteRoomRequest,
    ) -> anyhow::Result<()> {
        if room_name.is_empty() || uid.is_empty() {
            return Ok(());
        }
        let Some(room) = self.rooms.get_room(&room_name).await? else {
            return Ok(());
        };

        if room.created_by != uid {
            debug!(room = %room.name, uid = %uid, "room delete refused");
            self.hub.send_to(
                conn,
                &Outbound::error(ErrorScope::General, "Only the room creator can delete this room"),
            );
            return Ok(());
        }

        let report = self.cascade.delete_room(&room.name).await?;
        report.log("delete-room", &room.name);
        info!(room = %room.name, uid = %uid, "room deleted");
        self.hub.broadcast_room_list().await?;
        Ok(())
    }
}
