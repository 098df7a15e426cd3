//! User profile records. Profiles are written by the identity side; the relay
//! reads them and removes them on account deletion.

mod store;

use async_trait::async_trait;

use crate::db::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub uid: String,
    pub username: String,
    pub avatar_url: Option<String>,
    /// Media object id of the avatar, in the image category.
    pub avatar_public_id: Option<String>,
}

#[async_trait]
pub trait ProfileStore: Send + Sync + 'static {
    async fn get_profile(&self, uid: &str) -> Result<Option<Profile>, StoreError>;

    /// Inserts or replaces a profile.
    async fn put_profile(&self, profile: &Profile) -> Result<(), StoreError>;

    async fn delete_profile(&self, uid: &str) -> Result<(), StoreError>;
}
