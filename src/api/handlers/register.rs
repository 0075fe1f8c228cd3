use super::token_headers;
use crate::session::{Registration, SessionError, SessionService};
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
pub struct UserRegister {
    email: String,
    #[serde(alias = "password")]
    secret: String,
    #[serde(default, alias = "firstname")]
    given_name: String,
    #[serde(default, alias = "lastname")]
    family_name: String,
}

#[utoipa::path(
    post,
    path= "/register",
    request_body = UserRegister,
    responses (
        (status = 200, description = "Registration successful, session token in the x-auth-token header"),
        (status = 400, description = "Malformed request body"),
        (status = 500, description = "Token or storage failure"),
    ),
    tag= "register"
)]
// axum handler for register
#[instrument(skip(session, payload))]
pub async fn register(
    session: Extension<SessionService>,
    payload: Option<Json<UserRegister>>,
) -> Response {
    let Some(Json(user)) = payload else {
        return SessionError::MalformedRequest.into_response();
    };

    let registration = Registration {
        email: user.email,
        secret: user.secret,
        given_name: user.given_name,
        family_name: user.family_name,
    };

    match session
        .register(registration)
        .await
        .and_then(|minted| token_headers(&minted))
    {
        Ok(headers) => (StatusCode::OK, headers).into_response(),
        Err(e) => e.into_response(),
    }
}
