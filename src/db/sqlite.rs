use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};
use uuid::Uuid;

use super::{Message, Room, RoomRepository, StoreError};

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS rooms (
        name TEXT PRIMARY KEY NOT NULL,
        password TEXT,
        created_by TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY NOT NULL,
        room_name TEXT NOT NULL REFERENCES rooms(name) ON DELETE CASCADE,
        uid TEXT NOT NULL,
        username TEXT NOT NULL,
        text TEXT NOT NULL,
        reply_to TEXT,
        kind TEXT,
        public_id TEXT,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS messages_by_room ON messages (room_name, created_at)",
    "CREATE TABLE IF NOT EXISTS profiles (
        uid TEXT PRIMARY KEY NOT NULL,
        username TEXT NOT NULL,
        avatar_url TEXT,
        avatar_public_id TEXT
    )",
];

const MESSAGE_COLUMNS: &str = "id,room_name,uid,username,text,reply_to,kind,public_id,created_at";

/// Room, message and profile records in one SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    pub(crate) pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Private in-memory database on a single pinned connection.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[derive(FromRow)]
struct MessageRow {
    id: String,
    room_name: String,
    uid: String,
    username: String,
    text: String,
    reply_to: Option<String>,
    kind: Option<String>,
    public_id: Option<String>,
    created_at: i64,
}

impl TryFrom<MessageRow> for Message {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|_| StoreError::Corrupt(format!("message id {:?}", row.id)))?;
        Ok(Message {
            id,
            room_name: row.room_name,
            uid: row.uid,
            username: row.username,
            text: row.text,
            reply_to: row.reply_to,
            kind: row.kind,
            public_id: row.public_id,
            timestamp: row.created_at,
        })
    }
}

type RoomRow = (String, Option<String>, String, i64);

fn room_from_row((name, password, created_by, created_at): RoomRow) -> Room {
    Room { name, password, created_by, created_at }
}

#[async_trait]
impl RoomRepository for SqliteStore {
    async fn get_room(&self, name: &str) -> Result<Option<Room>, StoreError> {
        let row: Option<RoomRow> =
            sqlx::query_as("SELECT name,password,created_by,created_at FROM rooms WHERE name=?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(room_from_row))
    }

    async fn create_room(&self, room: &Room) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO rooms (name,password,created_by,created_at) VALUES (?,?,?,?)
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(&room.name)
        .bind(&room.password)
        .bind(&room.created_by)
        .bind(room.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_room(&self, name: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM rooms WHERE name=?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let rows: Vec<RoomRow> =
            sqlx::query_as("SELECT name,password,created_by,created_at FROM rooms ORDER BY created_at,rowid")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(room_from_row).collect())
    }

    async fn rooms_created_by(&self, uid: &str) -> Result<Vec<Room>, StoreError> {
        let rows: Vec<RoomRow> =
            sqlx::query_as("SELECT name,password,created_by,created_at FROM rooms WHERE created_by=?")
                .bind(uid)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(room_from_row).collect())
    }

    async fn add_message(&self, message: &Message) -> Result<(), StoreError> {
        // Clamped to the room's newest message so a clock step backwards
        // cannot reorder history.
        sqlx::query(&format!(
            "INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES (?,?,?,?,?,?,?,?,
                MAX(?, COALESCE((SELECT MAX(created_at) FROM messages WHERE room_name=?), 0)))"
        ))
            .bind(message.id.to_string())
            .bind(&message.room_name)
            .bind(&message.uid)
            .bind(&message.username)
            .bind(&message.text)
            .bind(&message.reply_to)
            .bind(&message.kind)
            .bind(&message.public_id)
            .bind(message.timestamp)
            .bind(&message.room_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_message(&self, room_name: &str, id: Uuid) -> Result<Option<Message>, StoreError> {
        let row: Option<MessageRow> =
            sqlx::query_as(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE room_name=? AND id=?"))
                .bind(room_name)
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        row.map(Message::try_from).transpose()
    }

    async fn delete_message(&self, room_name: &str, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM messages WHERE room_name=? AND id=?")
            .bind(room_name)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_messages(&self, room_name: &str) -> Result<Vec<Message>, StoreError> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE room_name=? ORDER BY created_at,rowid"
        ))
        .bind(room_name)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Message::try_from).collect()
    }

    async fn deep_delete(&self, room_name: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM messages WHERE room_name=?")
            .bind(room_name)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM rooms WHERE name=?")
            .bind(room_name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(name: &str, created_by: &str, password: Option<&str>) -> Room {
        Room {
            name: name.to_owned(),
            password: password.map(str::to_owned),
            created_by: created_by.to_owned(),
            created_at: 1_700_000_000_000,
        }
    }

    fn message(room_name: &str, text: &str, timestamp: i64) -> Message {
        Message {
            id: Uuid::now_v7(),
            room_name: room_name.to_owned(),
            uid: "u1".to_owned(),
            username: "Ann".to_owned(),
            text: text.to_owned(),
            reply_to: None,
            kind: None,
            public_id: None,
            timestamp,
        }
    }

    #[tokio::test]
    async fn create_is_conditional() {
        let store = SqliteStore::in_memory().await.unwrap();

        assert!(store.create_room(&room("lobby", "u1", None)).await.unwrap());
        assert!(!store.create_room(&room("lobby", "u2", Some("hash"))).await.unwrap());

        let stored = store.get_room("lobby").await.unwrap().unwrap();
        assert_eq!(stored.created_by, "u1");
        assert_eq!(stored.password, None);
    }

    #[tokio::test]
    async fn racing_creates_have_one_winner() {
        let store = SqliteStore::in_memory().await.unwrap();
        let first = room("lobby", "u1", None);
        let second = room("lobby", "u2", None);

        let (a, b) = tokio::join!(store.create_room(&first), store.create_room(&second));

        assert!(a.unwrap() ^ b.unwrap());
        assert_eq!(store.list_rooms().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn messages_come_back_oldest_first() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_room(&room("lobby", "u1", None)).await.unwrap();

        for (text, ts) in [("a", 10), ("b", 20), ("c", 20), ("d", 30)] {
            store.add_message(&message("lobby", text, ts)).await.unwrap();
        }

        let texts: Vec<_> = store
            .list_messages("lobby")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, ["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn clock_going_backwards_keeps_send_order() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_room(&room("lobby", "u1", None)).await.unwrap();
        store.create_room(&room("attic", "u1", None)).await.unwrap();

        let first = message("lobby", "first", 1_000);
        let second = message("lobby", "second", 400);
        let elsewhere = message("attic", "other room", 400);
        for msg in [&first, &second, &elsewhere] {
            store.add_message(msg).await.unwrap();
        }

        let stored = store.get_message("lobby", second.id).await.unwrap().unwrap();
        assert_eq!(stored.timestamp, 1_000);
        let texts: Vec<_> = store
            .list_messages("lobby")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, ["first", "second"]);

        let other = store.get_message("attic", elsewhere.id).await.unwrap().unwrap();
        assert_eq!(other.timestamp, 400);
    }

    #[tokio::test]
    async fn message_lookup_is_scoped_to_room() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_room(&room("lobby", "u1", None)).await.unwrap();
        store.create_room(&room("attic", "u1", None)).await.unwrap();
        let msg = message("lobby", "hi", 1);
        store.add_message(&msg).await.unwrap();

        assert_eq!(store.get_message("lobby", msg.id).await.unwrap(), Some(msg.clone()));
        assert_eq!(store.get_message("attic", msg.id).await.unwrap(), None);

        store.delete_message("attic", msg.id).await.unwrap();
        assert!(store.get_message("lobby", msg.id).await.unwrap().is_some());

        store.delete_message("lobby", msg.id).await.unwrap();
        assert!(store.get_message("lobby", msg.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_room_takes_its_messages() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_room(&room("lobby", "u1", None)).await.unwrap();
        store.create_room(&room("attic", "u1", None)).await.unwrap();
        store.add_message(&message("lobby", "one", 1)).await.unwrap();
        store.add_message(&message("attic", "two", 2)).await.unwrap();

        store.delete_room("lobby").await.unwrap();
        store.deep_delete("attic").await.unwrap();

        assert!(store.list_rooms().await.unwrap().is_empty());
        assert!(store.list_messages("lobby").await.unwrap().is_empty());
        assert!(store.list_messages("attic").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rooms_by_creator() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_room(&room("lobby", "u1", None)).await.unwrap();
        store.create_room(&room("attic", "u2", None)).await.unwrap();
        store.create_room(&room("cellar", "u1", Some("hash"))).await.unwrap();

        let mut names: Vec<_> = store
            .rooms_created_by("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        names.sort();
        assert_eq!(names, ["cellar", "lobby"]);
    }
}
