use crate::{session::SessionService, GIT_COMMIT_HASH};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Store is reachable", body = [Health]),
        (status = 503, description = "Store is unreachable", body = [Health])
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(method: Method, session: Extension<SessionService>) -> impl IntoResponse {
    let result = session.store().ping().await.map_err(|error| {
        error!("Failed to ping store: {}", error);
    });

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if result.is_ok() {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();

            headers.insert("X-App", x_app_header_value);

            headers
        })
        .map_err(|err| {
            error!("Failed to parse X-App header: {}", err);
        });

    // Unwrap the headers or provide a default value (empty headers) in case of an error
    let headers = headers.unwrap_or_else(|()| HeaderMap::new());

    if result.is_ok() {
        debug!("Store is healthy");
        (StatusCode::OK, headers, body)
    } else {
        debug!("Store is unhealthy");
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        session::{token::DEFAULT_TTL, TokenCodec},
        store::{failing::FailingStore, MemoryStore},
    };
    use axum::body::to_bytes;
    use secrecy::SecretString;
    use std::sync::Arc;

    fn codec() -> TokenCodec {
        TokenCodec::new(
            SecretString::from("0123456789abcdef0123456789abcdef".to_string()),
            DEFAULT_TTL,
        )
        .unwrap()
    }

    fn session() -> SessionService {
        SessionService::new(Arc::new(MemoryStore::new()), codec())
    }

    #[tokio::test]
    async fn health_reports_store_and_build() {
        let response = health(Method::GET, Extension(session()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("X-App"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: Health = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.name, env!("CARGO_PKG_NAME"));
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(health.database, "ok");
    }

    #[tokio::test]
    async fn options_has_empty_body() {
        let response = health(Method::OPTIONS, Extension(session()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() {
        let session = SessionService::new(Arc::new(FailingStore), codec());
        let response = health(Method::GET, Extension(session))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: Health = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.database, "error");
    }
}
