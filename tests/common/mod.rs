#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use roomrelay::{
    auth::{BcryptHasher, IdentityError, IdentityService},
    db::{Message, Room, RoomRepository, SqliteStore, StoreError},
    hub::{ClientConnection, ConnectionRegistry},
    media::{MediaCategory, MediaError, MediaStore, UploadedMedia},
    rooms::Collaborators,
    Relay,
};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Default)]
pub struct FakeMedia {
    pub destroyed: Mutex<Vec<(String, MediaCategory)>>,
    pub failing: Mutex<HashSet<String>>,
}

impl FakeMedia {
    pub fn fail_on(&self, public_id: &str) {
        self.failing.lock().unwrap().insert(public_id.to_owned());
    }

    pub fn destroyed(&self) -> Vec<(String, MediaCategory)> {
        self.destroyed.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for FakeMedia {
    async fn upload(&self, bytes: Vec<u8>, category: MediaCategory) -> Result<UploadedMedia, MediaError> {
        let public_id = format!("{}/{}", category.as_str(), bytes.len());
        Ok(UploadedMedia { url: format!("https://media.test/{public_id}"), public_id })
    }

    async fn destroy(&self, public_id: &str, category: MediaCategory) -> Result<(), MediaError> {
        self.destroyed.lock().unwrap().push((public_id.to_owned(), category));
        if self.failing.lock().unwrap().contains(public_id) {
            return Err(MediaError::Rejected { public_id: public_id.to_owned(), result: "error".to_owned() });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentityMode {
    #[default]
    Deletes,
    AlreadyGone,
    Broken,
}

#[derive(Default)]
pub struct FakeIdentity {
    pub mode: Mutex<IdentityMode>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeIdentity {
    pub fn set_mode(&self, mode: IdentityMode) {
        *self.mode.lock().unwrap() = mode;
    }
}

#[async_trait]
impl IdentityService for FakeIdentity {
    async fn delete_user(&self, uid: &str) -> Result<(), IdentityError> {
        self.calls.lock().unwrap().push(uid.to_owned());
        match *self.mode.lock().unwrap() {
            IdentityMode::Deletes => Ok(()),
            IdentityMode::AlreadyGone => Err(IdentityError::NotFound(uid.to_owned())),
            IdentityMode::Broken => Err(IdentityError::Other("INTERNAL".to_owned())),
        }
    }
}

/// Real SQLite rooms whose listing can be switched off.
pub struct FlakyRooms {
    pub inner: SqliteStore,
    pub listing_down: AtomicBool,
}

impl FlakyRooms {
    pub fn new(inner: SqliteStore) -> Self {
        Self { inner, listing_down: AtomicBool::new(false) }
    }

    pub fn break_listing(&self) {
        self.listing_down.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoomRepository for FlakyRooms {
    async fn get_room(&self, name: &str) -> Result<Option<Room>, StoreError> {
        self.inner.get_room(name).await
    }

    async fn create_room(&self, room: &Room) -> Result<bool, StoreError> {
        self.inner.create_room(room).await
    }

    async fn delete_room(&self, name: &str) -> Result<(), StoreError> {
        self.inner.delete_room(name).await
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        if self.listing_down.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("listing unavailable".to_owned()));
        }
        self.inner.list_rooms().await
    }

    async fn rooms_created_by(&self, uid: &str) -> Result<Vec<Room>, StoreError> {
        self.inner.rooms_created_by(uid).await
    }

    async fn add_message(&self, message: &Message) -> Result<(), StoreError> {
        self.inner.add_message(message).await
    }

    async fn get_message(&self, room_name: &str, id: Uuid) -> Result<Option<Message>, StoreError> {
        self.inner.get_message(room_name, id).await
    }

    async fn delete_message(&self, room_name: &str, id: Uuid) -> Result<(), StoreError> {
        self.inner.delete_message(room_name, id).await
    }

    async fn list_messages(&self, room_name: &str) -> Result<Vec<Message>, StoreError> {
        self.inner.list_messages(room_name).await
    }

    async fn deep_delete(&self, room_name: &str) -> Result<(), StoreError> {
        self.inner.deep_delete(room_name).await
    }
}

pub struct Harness {
    pub relay: Relay,
    pub store: SqliteStore,
    pub media: Arc<FakeMedia>,
    pub identity: Arc<FakeIdentity>,
}

pub struct Client {
    pub conn: Arc<ClientConnection>,
    pub rx: mpsc::Receiver<Arc<String>>,
}

impl Client {
    pub fn next(&mut self) -> Option<Value> {
        let raw = self.rx.try_recv().ok()?;
        Some(serde_json::from_str(&raw).unwrap())
    }

    pub fn drain(&mut self) -> Vec<Value> {
        std::iter::from_fn(|| self.next()).collect()
    }
}

pub async fn harness() -> Harness {
    let store = SqliteStore::in_memory().await.unwrap();
    harness_on(Arc::new(store.clone()), store)
}

/// Harness whose relay lists rooms through a [`FlakyRooms`] wrapper.
pub async fn harness_with_flaky_rooms() -> (Harness, Arc<FlakyRooms>) {
    let store = SqliteStore::in_memory().await.unwrap();
    let rooms = Arc::new(FlakyRooms::new(store.clone()));
    (harness_on(rooms.clone(), store), rooms)
}

fn harness_on(rooms: Arc<dyn RoomRepository>, store: SqliteStore) -> Harness {
    let media = Arc::new(FakeMedia::default());
    let identity = Arc::new(FakeIdentity::default());

    let relay = Relay::new(
        Collaborators {
            rooms,
            profiles: Arc::new(store.clone()),
            media: media.clone(),
            identity: identity.clone(),
            hasher: Arc::new(BcryptHasher::new(4)),
        },
        Arc::new(ConnectionRegistry::new(64)),
    );

    Harness { relay, store, media, identity }
}

impl Harness {
    pub async fn connect(&self) -> Client {
        let (conn, rx) = self.relay.hub().registry().open().await;
        Client { conn, rx }
    }

    pub async fn send(&self, client: &Client, event: Value) {
        self.relay.handle(&client.conn, &event.to_string()).await;
    }
}
