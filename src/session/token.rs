//! HS256 session tokens.
//!
//! A token is a compact JWT: `base64url(header).base64url(claims).base64url(mac)`.
//! The MAC is HMAC-SHA256 keyed with the process signing secret. Validity depends
//! only on the token bytes, the secret and the current time.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use ulid::Ulid;

type HmacSha256 = Hmac<Sha256>;

const ALG: &str = "HS256";
const TYP: &str = "JWT";

/// Signing secrets shorter than this are rejected at startup.
pub const MIN_SECRET_LEN: usize = 32;

/// Default session lifetime: 30 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("signing secret is too short")]
    InvalidKey,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: ALG.to_string(),
            typ: TYP.to_string(),
        }
    }
}

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Bound identity (the account email).
    pub sub: String,
    pub iat: i64,
    /// Absolute expiry, unix seconds.
    pub exp: i64,
    pub jti: String,
}

/// A freshly minted token and the moment it stops being valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedToken {
    pub token: String,
    pub expires_at: i64,
}

/// Mints and verifies session tokens with a fixed signing secret.
#[derive(Clone)]
pub struct TokenCodec {
    secret: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"***")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenCodec {
    /// Build a codec.
    ///
    /// # Errors
    /// Returns `TokenError::InvalidKey` if the secret is shorter than [`MIN_SECRET_LEN`].
    pub fn new(secret: SecretString, ttl: Duration) -> Result<Self, TokenError> {
        if secret.expose_secret().len() < MIN_SECRET_LEN {
            return Err(TokenError::InvalidKey);
        }

        Ok(Self { secret, ttl })
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token for `identity` valid for the configured ttl from now.
    ///
    /// # Errors
    /// Returns an error if the claims cannot be encoded or the MAC cannot be keyed.
    pub fn mint(&self, identity: &str) -> Result<MintedToken, TokenError> {
        self.mint_at(identity, now_unix_seconds())
    }

    /// Mint a token as if the current time were `now` (unix seconds).
    ///
    /// # Errors
    /// Returns an error if the claims cannot be encoded or the MAC cannot be keyed.
    pub fn mint_at(&self, identity: &str, now: i64) -> Result<MintedToken, TokenError> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = SessionClaims {
            sub: identity.to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
            jti: Ulid::new().to_string(),
        };

        let header_b64 = b64e_json(&TokenHeader::hs256())?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(MintedToken {
            token: format!("{signing_input}.{signature_b64}"),
            expires_at: claims.exp,
        })
    }

    /// Verify a token and return the bound identity.
    ///
    /// # Errors
    /// Returns an error if the token is malformed, the signature does not match or
    /// the token has expired.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, now_unix_seconds())
            .map(|claims| claims.sub)
    }

    /// Verify a token against `now` (unix seconds) and return its claims.
    ///
    /// # Errors
    /// Returns an error if the token is malformed, the signature does not match or
    /// `exp <= now`.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<SessionClaims, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        if parts.next().is_some() {
            return Err(TokenError::TokenFormat);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != ALG {
            return Err(TokenError::UnsupportedAlg(header.alg));
        }

        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Base64)?;
        let mut mac = self.mac()?;
        mac.update(format!("{header_b64}.{claims_b64}").as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: SessionClaims = b64d_json(claims_b64)?;
        if claims.exp <= now {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::InvalidKey)
    }
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| TokenError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[must_use]
pub fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}
