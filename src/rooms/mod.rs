//! The relay's session protocol: one inbound envelope in, side effects out.

mod account;
mod cascade;
mod msg;
mod new;
mod room;
mod ws;

use std::sync::Arc;

use axum::{debug_handler, extract::State, routing::get, Router};
use sqlx::SqlitePool;
use tracing::{debug, error};

use crate::{
    auth::{IdentityService, PasswordHasher},
    db::RoomRepository,
    hub::{BroadcastHub, ClientConnection, ConnectionRegistry},
    media::MediaStore,
    profiles::ProfileStore,
    protocol::Inbound,
    AppResult, AppState,
};

pub use cascade::{CascadeReport, CascadeStep, DeletionOrchestrator, StepFailure};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::relay_ws))
        .route("/health", get(health))
}

#[debug_handler(state = AppState)]
async fn health(State(db_pool): State<SqlitePool>) -> AppResult<&'static str> {
    sqlx::query("SELECT 1").execute(&db_pool).await?;
    Ok("ok")
}

/// Everything a relay needs from the outside world.
pub struct Collaborators {
    pub rooms: Arc<dyn RoomRepository>,
    pub profiles: Arc<dyn ProfileStore>,
    pub media: Arc<dyn MediaStore>,
    pub identity: Arc<dyn IdentityService>,
    pub hasher: Arc<dyn PasswordHasher>,
}

/// Stateless per connection: every action carries the room it applies to,
/// and nothing about a connection is remembered between envelopes.
#[derive(Clone)]
pub struct Relay {
    rooms: Arc<dyn RoomRepository>,
    hasher: Arc<dyn PasswordHasher>,
    hub: BroadcastHub,
    cascade: DeletionOrchestrator,
}

impl Relay {
    pub fn new(collaborators: Collaborators, registry: Arc<ConnectionRegistry>) -> Self {
        let Collaborators { rooms, profiles, media, identity, hasher } = collaborators;
        Self {
            hub: BroadcastHub::new(registry, rooms.clone()),
            cascade: DeletionOrchestrator::new(rooms.clone(), profiles, media, identity),
            rooms,
            hasher,
        }
    }

    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Handles one raw inbound envelope. Malformed or unknown envelopes are
    /// dropped without a reply; failures are logged, never sent back.
    pub async fn handle(&self, conn: &ClientConnection, raw: &str) {
        let event: Inbound = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(e) => {
                debug!(conn_id = %conn.id, error = %e, "dropping malformed event");
                return;
            }
        };

        let action = event.action();
        debug!(conn_id = %conn.id, action, "handling event");
        let outcome = match event {
            Inbound::Create(req) => self.create_room(conn, req).await,
            Inbound::Join(req) => self.join_room(conn, req).await,
            Inbound::Message(req) => self.send_msg(req).await,
            Inbound::DeleteMessage(req) => self.delete_msg(conn, req).await,
            Inbound::DeleteRoom(req) => self.delete_room(conn, req).await,
            Inbound::DeleteAccount(req) => self.delete_account(conn, req).await,
        };

        if let Err(e) = outcome {
            error!(conn_id = %conn.id, action, error = %format!("{e:#}"), "action failed");
        }
    }
}
