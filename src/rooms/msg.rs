use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    db::{now_millis, Message},
    hub::ClientConnection,
    protocol::{DeleteMessageRequest, Outbound, SendMessageRequest},
};

use super::Relay;

impl Relay {
    /// Persists a message and fans the stored copy out to every connection.
    /// Clients filter by room themselves.
    pub(crate) async fn send_msg(
        &self,
        SendMessageRequest { room_name, uid, username, text, reply_to, kind, public_id }: SendMessageRequest,
    ) -> anyhow::Result<()> {
        if self.rooms.get_room(&room_name).await?.is_none() {
            debug!(room = %room_name, "message for unknown room dropped");
            return Ok(());
        }

        let message = Message {
            id: Uuid::now_v7(),
            room_name,
            uid,
            username,
            text,
            reply_to,
            kind,
            public_id,
            timestamp: now_millis(),
        };
        self.rooms.add_message(&message).await?;

        let Some(stored) = self.rooms.get_message(&message.room_name, message.id).await? else {
            warn!(room = %message.room_name, msg_id = %message.id, "message vanished after write");
            return Ok(());
        };
        self.hub.broadcast_to_all(&Outbound::Message { message: stored }).await;
        Ok(())
    }

    /// Author-only. Anyone else gets no reply at all, so message ids don't
    /// leak. The confirmation goes to the sender only.
    pub(crate) async fn delete_msg(
        &self,
        conn: &ClientConnection,
        DeleteMessageRequest { room_name, msg_id, uid }: DeleteMessageRequest,
    ) -> anyhow::Result<()> {
        let Some(msg_id) = msg_id else {
            return Ok(());
        };
        let Some(message) = self.rooms.get_message(&room_name, msg_id).await? else {
            return Ok(());
        };
        if uid.is_empty() || message.uid != uid {
            debug!(room = %room_name, %msg_id, uid = %uid, "message delete refused");
            return Ok(());
        }

        if message.public_id.is_some() {
            let report = self.cascade.cascade_room_media(std::slice::from_ref(&message)).await;
            report.log("delete-message", &msg_id.to_string());
        }

        self.rooms.delete_message(&room_name, msg_id).await?;
        self.hub.send_to(conn, &Outbound::MessageDeleted { msg_id });
        Ok(())
    }
}
