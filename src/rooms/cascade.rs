//! Multi-step deletions that span room records, profiles, the identity
//! record and externally hosted media.
//!
//! Every step is attempted independently and its outcome lands in a
//! [`CascadeReport`]. Steps are idempotent (missing rows and missing blobs
//! count as removed), so a report's failed steps can simply be run again.

use std::{fmt, sync::Arc};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{IdentityError, IdentityService},
    db::{Message, RoomRepository, StoreError},
    media::{MediaCategory, MediaStore},
    profiles::ProfileStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeStep {
    IdentityRecord { uid: String },
    ProfileLookup { uid: String },
    Avatar { public_id: String },
    Profile { uid: String },
    RoomLookup { uid: String },
    MessageLookup { room: String },
    MessageMedia { msg_id: Uuid, public_id: String, category: MediaCategory },
    Room { name: String },
}

impl fmt::Display for CascadeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeStep::IdentityRecord { uid } => write!(f, "identity record of {uid}"),
            CascadeStep::ProfileLookup { uid } => write!(f, "profile lookup for {uid}"),
            CascadeStep::Avatar { public_id } => write!(f, "avatar {public_id}"),
            CascadeStep::Profile { uid } => write!(f, "profile of {uid}"),
            CascadeStep::RoomLookup { uid } => write!(f, "rooms created by {uid}"),
            CascadeStep::MessageLookup { room } => write!(f, "messages of {room}"),
            CascadeStep::MessageMedia { msg_id, public_id, category } => {
                write!(f, "{} {public_id} of message {msg_id}", category.as_str())
            }
            CascadeStep::Room { name } => write!(f, "room {name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub step: CascadeStep,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub completed: Vec<CascadeStep>,
    pub failed: Vec<StepFailure>,
}

impl CascadeReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Records a step's outcome. Returns whether it succeeded.
    fn record<E: fmt::Display>(&mut self, step: CascadeStep, outcome: Result<(), E>) -> bool {
        match outcome {
            Ok(()) => {
                self.completed.push(step);
                true
            }
            Err(e) => {
                warn!(%step, error = %e, "cascade step failed");
                self.failed.push(StepFailure { step, error: e.to_string() });
                false
            }
        }
    }

    fn extend(&mut self, other: CascadeReport) {
        self.completed.extend(other.completed);
        self.failed.extend(other.failed);
    }

    pub fn log(&self, flow: &str, subject: &str) {
        if self.is_clean() {
            info!(flow, subject, steps = self.completed.len(), "cascade finished");
        } else {
            let failed: Vec<String> = self.failed.iter().map(|f| f.step.to_string()).collect();
            warn!(
                flow,
                subject,
                steps = self.completed.len(),
                failed = ?failed,
                "cascade finished with failures"
            );
        }
    }
}

#[derive(Clone)]
pub struct DeletionOrchestrator {
    rooms: Arc<dyn RoomRepository>,
    profiles: Arc<dyn ProfileStore>,
    media: Arc<dyn MediaStore>,
    identity: Arc<dyn IdentityService>,
}

impl DeletionOrchestrator {
    pub fn new(
        rooms: Arc<dyn RoomRepository>,
        profiles: Arc<dyn ProfileStore>,
        media: Arc<dyn MediaStore>,
        identity: Arc<dyn IdentityService>,
    ) -> Self {
        Self { rooms, profiles, media, identity }
    }

    /// Destroys the media of every message that has some. Never fails; one
    /// blob's failure does not stop the rest.
    pub async fn cascade_room_media(&self, messages: &[Message]) -> CascadeReport {
        let mut report = CascadeReport::default();
        for message in messages {
            let Some(public_id) = &message.public_id else {
                continue;
            };
            let category = MediaCategory::for_kind(message.kind.as_deref());
            let outcome = self.media.destroy(public_id, category).await;
            report.record(
                CascadeStep::MessageMedia { msg_id: message.id, public_id: public_id.clone(), category },
                outcome,
            );
        }
        report
    }

    /// Media cascade for a room, then the room record. If the messages
    /// cannot be listed nothing is deleted.
    pub async fn delete_room(&self, room_name: &str) -> Result<CascadeReport, StoreError> {
        let messages = self.rooms.list_messages(room_name).await?;
        let mut report = self.cascade_room_media(&messages).await;
        self.rooms.delete_room(room_name).await?;
        report.completed.push(CascadeStep::Room { name: room_name.to_owned() });
        Ok(report)
    }

    /// Removes an account and everything it created.
    ///
    /// The identity record goes first. If the identity service fails for
    /// any reason other than the account already being gone, the flow stops
    /// there and the error is returned; profile and rooms are left as they
    /// are. Everything after that step is best-effort.
    pub async fn delete_account(&self, uid: &str) -> Result<CascadeReport, IdentityError> {
        let mut report = CascadeReport::default();

        match self.identity.delete_user(uid).await {
            Ok(()) => {}
            Err(IdentityError::NotFound(_)) => info!(uid, "identity record already absent"),
            Err(e) => return Err(e),
        }
        report.completed.push(CascadeStep::IdentityRecord { uid: uid.to_owned() });

        match self.profiles.get_profile(uid).await {
            Ok(profile) => {
                if let Some(public_id) = profile.and_then(|p| p.avatar_public_id) {
                    let outcome = self.media.destroy(&public_id, MediaCategory::Image).await;
                    report.record(CascadeStep::Avatar { public_id }, outcome);
                }
            }
            Err(e) => {
                report.record(CascadeStep::ProfileLookup { uid: uid.to_owned() }, Err(e));
            }
        }

        let outcome = self.profiles.delete_profile(uid).await;
        report.record(CascadeStep::Profile { uid: uid.to_owned() }, outcome);

        let rooms = match self.rooms.rooms_created_by(uid).await {
            Ok(rooms) => rooms,
            Err(e) => {
                report.record(CascadeStep::RoomLookup { uid: uid.to_owned() }, Err(e));
                return Ok(report);
            }
        };

        for room in rooms {
            let messages = match self.rooms.list_messages(&room.name).await {
                Ok(messages) => messages,
                Err(e) => {
                    report.record(CascadeStep::MessageLookup { room: room.name }, Err(e));
                    continue;
                }
            };
            report.extend(self.cascade_room_media(&messages).await);

            let outcome = self.rooms.deep_delete(&room.name).await;
            report.record(CascadeStep::Room { name: room.name }, outcome);
        }

        Ok(report)
    }
}
