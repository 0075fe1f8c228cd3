use super::token_headers;
use crate::session::{SessionError, SessionService};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize)]
pub struct UserAuthenticate {
    email: String,
    #[serde(alias = "password")]
    secret: String,
}

#[utoipa::path(
    post,
    path= "/authenticate",
    request_body = UserAuthenticate,
    responses (
        (status = 200, description = "Authenticated, session token in the x-auth-token header"),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Unauthorized"),
    ),
    tag= "authenticate"
)]
// axum handler for authenticate
#[instrument(skip(session, payload))]
pub async fn authenticate(
    session: Extension<SessionService>,
    payload: Option<Json<UserAuthenticate>>,
) -> Response {
    let Some(Json(user)) = payload else {
        return SessionError::MalformedRequest.into_response();
    };

    match session
        .authenticate(&user.email, &user.secret)
        .await
        .and_then(|minted| token_headers(&minted))
    {
        Ok(headers) => (StatusCode::OK, headers).into_response(),
        Err(e) => e.into_response(),
    }
}
