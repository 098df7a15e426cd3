//! Gateway to the external object store holding message attachments and
//! avatars.

mod cloud;

use async_trait::async_trait;
use thiserror::Error;

pub use cloud::CloudMediaStore;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("media store rejected {public_id}: {result}")]
    Rejected { public_id: String, result: String },

    #[error("unexpected media store response: {0}")]
    Malformed(String),
}

/// Resource category in the object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCategory {
    Image,
    /// Also where audio clips live.
    Video,
}

impl MediaCategory {
    /// Audio uploads are stored as video resources; everything else is an
    /// image.
    pub fn for_kind(kind: Option<&str>) -> Self {
        match kind {
            Some(crate::db::AUDIO_KIND) => MediaCategory::Video,
            _ => MediaCategory::Image,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::Video => "video",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub public_id: String,
    pub url: String,
}

#[async_trait]
pub trait MediaStore: Send + Sync + 'static {
    async fn upload(&self, bytes: Vec<u8>, category: MediaCategory) -> Result<UploadedMedia, MediaError>;

    /// Removes a blob. A blob that is already gone counts as removed.
    async fn destroy(&self, public_id: &str, category: MediaCategory) -> Result<(), MediaError>;
}
