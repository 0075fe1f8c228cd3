use super::session_token;
use crate::{
    session::{SessionError, SessionService},
    store::{Profile, ProfilePatch},
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

/// Display name changes. Omitted fields are left as stored; an `email` field is ignored.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct ProfileUpdate {
    #[serde(default, alias = "firstname")]
    given_name: Option<String>,
    #[serde(default, alias = "lastname")]
    family_name: Option<String>,
}

#[utoipa::path(
    get,
    path= "/profile",
    params(
        ("x-auth-token" = String, Header, description = "Session token"),
    ),
    responses (
        (status = 200, description = "Profile of the token's account", body = [Profile]),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 404, description = "No record for the token's account"),
        (status = 500, description = "Storage failure"),
    ),
    tag= "profile"
)]
// axum handler for reading the caller's profile
#[instrument(skip(session, headers))]
pub async fn get_profile(session: Extension<SessionService>, headers: HeaderMap) -> Response {
    match session.profile(session_token(&headers)).await {
        Ok(profile) => (StatusCode::OK, Json(vec![profile])).into_response(),
        Err(e) => e.into_response(),
    }
}

#[utoipa::path(
    put,
    path= "/profile",
    request_body = ProfileUpdate,
    params(
        ("x-auth-token" = String, Header, description = "Session token"),
    ),
    responses (
        (status = 200, description = "Profile updated"),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 404, description = "No record for the token's account"),
        (status = 500, description = "Storage failure"),
    ),
    tag= "profile"
)]
// axum handler for updating the caller's profile
#[instrument(skip(session, headers, payload))]
pub async fn put_profile(
    session: Extension<SessionService>,
    headers: HeaderMap,
    payload: Option<Json<ProfileUpdate>>,
) -> Response {
    let token = session_token(&headers);

    // token errors take precedence over body errors
    let Some(Json(update)) = payload else {
        return match session.identity(token) {
            Ok(_) => SessionError::MalformedRequest.into_response(),
            Err(e) => e.into_response(),
        };
    };

    let patch = ProfilePatch {
        given_name: update.given_name,
        family_name: update.family_name,
    };

    match session.update_profile(token, patch).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn update_accepts_partial_and_legacy_fields() {
        let update: ProfileUpdate = serde_json::from_str(r#"{"given_name":"A2"}"#).unwrap();
        assert_eq!(update.given_name.as_deref(), Some("A2"));
        assert_eq!(update.family_name, None);

        let update: ProfileUpdate =
            serde_json::from_str(r#"{"firstname":"E","lastname":"C","email":"b@x.com"}"#).unwrap();
        assert_eq!(update.given_name.as_deref(), Some("E"));
        assert_eq!(update.family_name.as_deref(), Some("C"));
    }
}
