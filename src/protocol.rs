//! JSON envelopes exchanged over the relay socket.
//!
//! Field names and tag strings are what existing clients speak; keep them
//! byte-for-byte.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{Message, Room};

/// Inbound envelope, dispatched on its `action` field. Unknown actions fail
/// to parse and are dropped by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Inbound {
    Create(NewRoomRequest),
    Join(JoinRoomRequest),
    Message(SendMessageRequest),
    DeleteMessage(DeleteMessageRequest),
    DeleteRoom(DeleteRoomRequest),
    DeleteAccount(DeleteAccountRequest),
}

impl Inbound {
    pub fn action(&self) -> &'static str {
        match self {
            Inbound::Create(_) => "create",
            Inbound::Join(_) => "join",
            Inbound::Message(_) => "message",
            Inbound::DeleteMessage(_) => "delete-message",
            Inbound::DeleteRoom(_) => "delete-room",
            Inbound::DeleteAccount(_) => "delete-account",
        }
    }
}

// Missing string fields decode as empty and are rejected by the handlers.

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoomRequest {
    #[serde(default)]
    pub room_name: String,
    #[serde(default)]
    pub uid: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    #[serde(default)]
    pub room_name: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub room_name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub text: String,
    pub reply_to: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "public_id")]
    pub public_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessageRequest {
    #[serde(default)]
    pub room_name: String,
    pub msg_id: Option<Uuid>,
    #[serde(default)]
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRoomRequest {
    #[serde(default)]
    pub room_name: String,
    #[serde(default)]
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeleteAccountRequest {
    #[serde(default)]
    pub uid: String,
}

/// Which flow an error reply belongs to. Clients route on this, not on the
/// envelope type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorScope {
    Create,
    Join,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub name: String,
    pub has_password: bool,
    pub created_by: String,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        RoomSummary {
            name: room.name.clone(),
            has_password: room.is_protected(),
            created_by: room.created_by.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Outbound {
    RoomsUpdated { rooms: Vec<RoomSummary> },
    CreateSuccess { room_name: String },
    JoinSuccess { room_name: String, messages: Vec<Message> },
    Message { message: Message },
    MessageDeleted { msg_id: Uuid },
    DeleteSuccess,
    Error { action: ErrorScope, message: String },
}

impl Outbound {
    pub fn error(action: ErrorScope, message: impl Into<String>) -> Self {
        Outbound::Error { action, message: message.into() }
    }
}
