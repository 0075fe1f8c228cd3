//! Route handlers and the helpers they share.

pub mod authenticate;
pub mod health;
pub mod profile;
pub mod register;

pub use self::authenticate::authenticate;
pub use self::health::health;
pub use self::profile::{get_profile, put_profile};
pub use self::register::register;

use crate::session::{MintedToken, SessionError};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use tracing::error;

/// Request and response header carrying the session token.
pub const TOKEN_HEADER: &str = "x-auth-token";

/// Response header carrying the token expiry in unix seconds.
pub const TOKEN_EXPIRES_HEADER: &str = "x-auth-token-expires";

/// Read the session token from the request headers.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Headers handed back after a successful register or authenticate.
pub fn token_headers(minted: &MintedToken) -> Result<HeaderMap, SessionError> {
    let token = HeaderValue::from_str(&minted.token).map_err(|e| {
        error!("Token is not a valid header value: {}", e);
        SessionError::SigningFault
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(TOKEN_HEADER), token);
    headers.insert(
        HeaderName::from_static(TOKEN_EXPIRES_HEADER),
        HeaderValue::from(minted.expires_at),
    );

    Ok(headers)
}
