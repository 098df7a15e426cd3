//! Identity-side collaborators: account removal and room password hashing.
//! The relay trusts the uid it is handed; nothing here issues identities.

mod identity;
mod password;

use async_trait::async_trait;
use thiserror::Error;

pub use identity::FirebaseIdentity;
pub use password::BcryptHasher;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The account is already gone.
    #[error("user {0} not found")]
    NotFound(String),

    #[error("identity service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("identity service error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum HashError {
    #[error("bcrypt: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait IdentityService: Send + Sync + 'static {
    async fn delete_user(&self, uid: &str) -> Result<(), IdentityError>;
}

#[async_trait]
pub trait PasswordHasher: Send + Sync + 'static {
    async fn hash(&self, password: &str) -> Result<String, HashError>;

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, HashError>;
}
