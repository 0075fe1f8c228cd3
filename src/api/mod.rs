#![allow(clippy::needless_for_each)]

use crate::session::SessionService;
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod handlers;

use handlers::{TOKEN_EXPIRES_HEADER, TOKEN_HEADER};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::register::register,
        handlers::authenticate::authenticate,
        handlers::profile::get_profile,
        handlers::profile::put_profile,
    ),
    components(schemas(
        handlers::health::Health,
        handlers::register::UserRegister,
        handlers::authenticate::UserAuthenticate,
        handlers::profile::ProfileUpdate,
        crate::store::Profile,
    )),
    tags(
        (name = "tessera", description = "Accounts and session tokens")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the application router around a session service.
pub fn router(session: SessionService) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(TOKEN_HEADER),
        ])
        .expose_headers([
            HeaderName::from_static(TOKEN_HEADER),
            HeaderName::from_static(TOKEN_EXPIRES_HEADER),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_origin(Any);

    Router::new()
        .route("/", get(|| async { "🌱" }))
        .route("/register", post(handlers::register))
        .route("/authenticate", post(handlers::authenticate))
        .route(
            "/profile",
            get(handlers::get_profile).put(handlers::put_profile),
        )
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(session)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, session: SessionService) -> Result<()> {
    let app = router(session);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
