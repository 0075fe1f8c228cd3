//! Registration, authentication and profile access.
//!
//! The acting identity for every profile operation is taken from a verified
//! session token, never from the request body.

pub mod secret;
pub mod token;

pub use token::{MintedToken, TokenCodec, TokenError};

use crate::store::{CredentialStore, Identity, Profile, ProfilePatch, UpdateOutcome};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("malformed request")]
    MalformedRequest,
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid credentials")]
    CredentialMismatch,
    #[error("not found")]
    NotFound,
    #[error("storage fault")]
    StorageFault,
    #[error("signing fault")]
    SigningFault,
}

impl SessionError {
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::MalformedRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::CredentialMismatch => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::StorageFault | Self::SigningFault => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Registration input.
#[derive(Clone)]
pub struct Registration {
    pub email: String,
    pub secret: String,
    pub given_name: String,
    pub family_name: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("secret", &"***")
            .field("given_name", &self.given_name)
            .field("family_name", &self.family_name)
            .finish()
    }
}

/// Lowercase and trim an email so lookups are case-insensitive.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Lightweight email sanity check.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

/// Shared by every request: the token codec and the credential store.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn CredentialStore>,
    codec: Arc<TokenCodec>,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl SessionService {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, codec: TokenCodec) -> Self {
        Self {
            store,
            codec: Arc::new(codec),
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Create an account (or refresh its display names) and mint a token for it.
    ///
    /// Re-registering an existing email refreshes its display names only; the
    /// stored secret is never replaced.
    ///
    /// # Errors
    /// `MalformedRequest` for an invalid email or empty secret, `SigningFault` or
    /// `StorageFault` otherwise.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> Result<MintedToken, SessionError> {
        let email = normalize_email(&registration.email);

        if !valid_email(&email) || registration.secret.is_empty() {
            debug!("rejecting malformed registration");
            return Err(SessionError::MalformedRequest);
        }

        let minted = self.codec.mint(&email).map_err(|e| {
            error!("Error minting token: {}", e);
            SessionError::SigningFault
        })?;

        let plaintext = registration.secret;
        let secret_hash = tokio::task::spawn_blocking(move || secret::hash_secret(&plaintext))
            .await
            .map_err(|e| {
                error!("Hashing task failed: {}", e);
                SessionError::StorageFault
            })?
            .map_err(|e| {
                error!("Error hashing secret: {}", e);
                SessionError::StorageFault
            })?;

        let identity = Identity {
            email,
            secret_hash,
            given_name: registration.given_name,
            family_name: registration.family_name,
        };

        self.store.upsert(&identity).await.map_err(|e| {
            error!("Error saving user: {}", e);
            SessionError::StorageFault
        })?;

        debug!("registration complete");

        Ok(minted)
    }

    /// Check a password and mint a token for the account.
    ///
    /// # Errors
    /// `CredentialMismatch` for an unknown email, a wrong secret or a store fault.
    #[instrument(skip(self, secret))]
    pub async fn authenticate(&self, email: &str, secret: &str) -> Result<MintedToken, SessionError> {
        let email = normalize_email(email);

        let matched = match self.store.matches(&email, secret).await {
            Ok(matched) => matched,
            Err(e) => {
                error!("Error checking credentials: {}", e);
                false
            }
        };

        if !matched {
            debug!("Unauthorized");
            return Err(SessionError::CredentialMismatch);
        }

        self.codec.mint(&email).map_err(|e| {
            error!("Error minting token: {}", e);
            SessionError::SigningFault
        })
    }

    /// Resolve a token to the identity it is bound to.
    ///
    /// # Errors
    /// `Unauthorized` for a missing, malformed, forged or expired token.
    pub fn identity(&self, token: Option<&str>) -> Result<String, SessionError> {
        let token = token.ok_or(SessionError::Unauthorized)?;

        self.codec.verify(token).map_err(|e| {
            debug!("token rejected: {}", e);
            SessionError::Unauthorized
        })
    }

    /// Public profile of the token's own identity.
    ///
    /// # Errors
    /// `Unauthorized`, `NotFound` or `StorageFault`.
    #[instrument(skip(self, token))]
    pub async fn profile(&self, token: Option<&str>) -> Result<Profile, SessionError> {
        let email = self.identity(token)?;

        self.store
            .profile(&email)
            .await
            .map_err(|e| {
                error!("Error reading profile: {}", e);
                SessionError::StorageFault
            })?
            .ok_or(SessionError::NotFound)
    }

    /// Apply `patch` to the token's own identity.
    ///
    /// # Errors
    /// `Unauthorized`, `NotFound` or `StorageFault`.
    #[instrument(skip(self, token))]
    pub async fn update_profile(
        &self,
        token: Option<&str>,
        patch: ProfilePatch,
    ) -> Result<(), SessionError> {
        let email = self.identity(token)?;

        match self.store.update_profile(&email, &patch).await {
            Ok(UpdateOutcome::Updated) => Ok(()),
            Ok(UpdateOutcome::NotFound) => {
                warn!("token identity has no record");
                Err(SessionError::NotFound)
            }
            Err(e) => {
                error!("Error updating profile: {}", e);
                Err(SessionError::StorageFault)
            }
        }
    }
}
