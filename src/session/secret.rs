//! Password hashing.
//!
//! Secrets are stored as Argon2id PHC strings with a random salt per hash.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use once_cell::sync::Lazy;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to hash secret")]
    Hash,
    #[error("invalid stored secret hash")]
    InvalidHash,
}

// Verified against when the email is unknown so both outcomes cost one Argon2 run.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_secret("tessera-dummy-secret").ok());

/// Hash a plaintext secret for storage.
///
/// # Errors
/// Returns an error if Argon2 fails to produce a hash.
pub fn hash_secret(secret: &str) -> Result<String, SecretError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| SecretError::Hash)
}

/// Check a plaintext secret against a stored PHC string.
///
/// # Errors
/// Returns an error if the stored value is not a valid PHC string.
pub fn verify_secret(secret: &str, stored_hash: &str) -> Result<bool, SecretError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| SecretError::InvalidHash)?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}

/// Burn one verification for an unknown account. Always false.
pub fn verify_against_dummy(secret: &str) -> bool {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_secret(secret, hash);
    }
    false
}
