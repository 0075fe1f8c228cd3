//! Identity record persistence.
//!
//! One record per email. The store compares emails exactly; callers normalize
//! them first (see `session::normalize_email`).

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::session::secret::{self, SecretError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Secret(#[from] SecretError),
    #[error("background task failed")]
    Task,
}

/// A full identity record as persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    /// Argon2id PHC string.
    pub secret_hash: String,
    pub given_name: String,
    pub family_name: String,
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("email", &self.email)
            .field("secret_hash", &"***")
            .field("given_name", &self.given_name)
            .field("family_name", &self.family_name)
            .finish()
    }
}

/// Public view of an identity record.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Profile {
    pub email: String,
    pub given_name: String,
    pub family_name: String,
}

impl From<&Identity> for Profile {
    fn from(identity: &Identity) -> Self {
        Self {
            email: identity.email.clone(),
            given_name: identity.given_name.clone(),
            family_name: identity.family_name.clone(),
        }
    }
}

/// Display name changes. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a record; on email conflict overwrite only the display names.
    async fn upsert(&self, identity: &Identity) -> Result<(), StoreError>;

    /// Change the display names of exactly the record keyed by `email`.
    async fn update_profile(
        &self,
        email: &str,
        patch: &ProfilePatch,
    ) -> Result<UpdateOutcome, StoreError>;

    async fn secret_hash(&self, email: &str) -> Result<Option<String>, StoreError>;

    async fn profile(&self, email: &str) -> Result<Option<Profile>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.secret_hash(email).await?.is_some())
    }

    /// True iff a record with `email` exists and `secret` verifies against it.
    ///
    /// An unknown email and a wrong secret both return `false`.
    async fn matches(&self, email: &str, secret: &str) -> Result<bool, StoreError> {
        let stored = self.secret_hash(email).await?;
        let secret = secret.to_string();

        tokio::task::spawn_blocking(move || match stored {
            Some(hash) => secret::verify_secret(&secret, &hash),
            None => Ok(secret::verify_against_dummy(&secret)),
        })
        .await
        .map_err(|_| StoreError::Task)?
        .map_err(StoreError::from)
    }
}

#[cfg(test)]
pub(crate) mod failing {
    use super::{CredentialStore, Identity, Profile, ProfilePatch, StoreError, UpdateOutcome};
    use async_trait::async_trait;

    fn down() -> StoreError {
        StoreError::Database(sqlx::Error::PoolClosed)
    }

    /// Every call fails as if the database were unreachable.
    pub(crate) struct FailingStore;

    #[async_trait]
    impl CredentialStore for FailingStore {
        async fn upsert(&self, _identity: &Identity) -> Result<(), StoreError> {
            Err(down())
        }

        async fn update_profile(
            &self,
            _email: &str,
            _patch: &ProfilePatch,
        ) -> Result<UpdateOutcome, StoreError> {
            Err(down())
        }

        async fn secret_hash(&self, _email: &str) -> Result<Option<String>, StoreError> {
            Err(down())
        }

        async fn profile(&self, _email: &str) -> Result<Option<Profile>, StoreError> {
            Err(down())
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(down())
        }
    }
}
