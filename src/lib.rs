//! Folio is the credential and session API behind a personal portfolio.

#![forbid(unsafe_code)]

pub mod account;
pub mod config;
pub mod crypto;
pub mod error;
pub mod router;
pub mod token;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::http::{Method, header};
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    app.oneshot(
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Same as [`make_request`], with a `Cookie` header attached.
#[cfg(test)]
pub async fn make_request_with_cookie(
    app: Router,
    method: Method,
    path: &str,
    cookie: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    app.oneshot(
        Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, cookie)
            .body(axum::body::Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub store: Arc<dyn account::CredentialStore>,
    pub hasher: Arc<crypto::PasswordManager>,
    pub token: token::TokenManager,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([
            header::AUTHORIZATION,
            header::COOKIE,
        ]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    Router::new()
        // `GET /health` goes to the liveness probe.
        .route("/health", get(router::health::handler))
        // `POST /register` creates an account.
        .route("/register", post(router::register::handler))
        // `POST /login` opens a session.
        .route("/login", post(router::login::handler))
        // `POST /refresh` renews an access token from the cookie.
        .route("/refresh", post(router::refresh::handler))
        // `GET /users/:ID` returns the public projection.
        .route("/users/{user_id}", get(router::users::handler))
        .fallback(router::unknown_route)
        .with_state(state)
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>>
{
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;

    let store: Arc<dyn account::CredentialStore> = match config.postgres {
        Some(ref cfg) => {
            let store = account::PgCredentialStore::connect(
                &cfg.address,
                &cfg.username
                    .clone()
                    .unwrap_or(account::DEFAULT_CREDENTIALS.into()),
                &cfg.password
                    .clone()
                    .unwrap_or(account::DEFAULT_CREDENTIALS.into()),
                &cfg.database
                    .clone()
                    .unwrap_or(account::DEFAULT_DATABASE_NAME.into()),
                cfg.pool_size.unwrap_or(account::DEFAULT_POOL_SIZE),
            )
            .await?;

            // execute migrations scripts on start.
            sqlx::migrate!().run(&store.pool).await?;

            Arc::new(store)
        },
        None => {
            tracing::warn!(
                "missing `postgres` entry on `config.yaml` file, accounts only live in memory"
            );
            Arc::new(account::MemoryCredentialStore::new())
        },
    };

    let hasher =
        Arc::new(crypto::PasswordManager::new(config.argon2.clone())?);

    // handle jwt. an empty or missing secret refuses to start.
    let secret = std::env::var("JWT_SECRET").unwrap_or_default();
    let token =
        token::TokenManager::new(&config.url, &secret, config.token.clone())?;

    Ok(AppState {
        config,
        store,
        hasher,
        token,
    })
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;

    use super::*;

    #[tokio::test]
    async fn test_unknown_route_keeps_error_envelope() {
        let state = router::state();
        let app = app(state);

        let response = make_request(
            app,
            Method::GET,
            "/definitely-not-a-route",
            String::default(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["title"], "Route not found.");
        assert_eq!(body["status"], 404);
    }
}
