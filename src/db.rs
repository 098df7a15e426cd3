//! Durable room and message records.
//!
//! A room is keyed by its human-chosen name and exclusively owns its
//! messages. Messages carry `room_name` for display only; they are always
//! looked up through their room.

mod sqlite;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub name: String,
    /// bcrypt hash; `None` means the room is public.
    pub password: Option<String>,
    pub created_by: String,
    pub created_at: i64,
}

impl Room {
    pub fn is_protected(&self) -> bool {
        self.password.is_some()
    }
}

/// Media kind tag that routes cleanup to the video category.
pub const AUDIO_KIND: &str = "audio";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub room_name: String,
    pub uid: String,
    pub username: String,
    pub text: String,
    pub reply_to: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "public_id")]
    pub public_id: Option<String>,
    /// Milliseconds since the Unix epoch, assigned by the relay.
    pub timestamp: i64,
}

impl Message {
    pub fn is_audio(&self) -> bool {
        self.kind.as_deref() == Some(AUDIO_KIND)
    }
}

/// Server clock in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[async_trait]
pub trait RoomRepository: Send + Sync + 'static {
    async fn get_room(&self, name: &str) -> Result<Option<Room>, StoreError>;

    /// Conditional write: persists `room` only if no room with that name
    /// exists. Returns whether the row was written.
    async fn create_room(&self, room: &Room) -> Result<bool, StoreError>;

    /// Removes the room record. Child messages go with it.
    async fn delete_room(&self, name: &str) -> Result<(), StoreError>;

    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError>;

    async fn rooms_created_by(&self, uid: &str) -> Result<Vec<Room>, StoreError>;

    /// Persists a message. The stored timestamp is never older than the
    /// room's newest message, so re-read the record for the final value.
    async fn add_message(&self, message: &Message) -> Result<(), StoreError>;

    async fn get_message(&self, room_name: &str, id: Uuid) -> Result<Option<Message>, StoreError>;

    async fn delete_message(&self, room_name: &str, id: Uuid) -> Result<(), StoreError>;

    /// All messages of a room, oldest first. Equal timestamps keep insertion order.
    async fn list_messages(&self, room_name: &str) -> Result<Vec<Message>, StoreError>;

    /// Removes every message of the room and then the room itself, in one
    /// transaction.
    async fn deep_delete(&self, room_name: &str) -> Result<(), StoreError>;
}
