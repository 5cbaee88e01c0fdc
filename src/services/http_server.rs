//! HTTP server for the review API.
//!
//! Builds the axum router (public, read and write route groups, each with its
//! own auth guard), wraps it in logging, timeout and CORS layers and serves it
//! until the cancellation token fires.

use crate::config::AppConfig;
use crate::db::{self, DbError, Transactor};
use crate::error::AppError;
use crate::services::http_api::{
    error_response, public_routes, read_routes, write_routes, ApiState,
};
use crate::services::http_auth::{require_role, Role, RoleGuard, TokenSigner};
use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use uuid::Uuid;

/// Response header carrying the per-request id used in log lines.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("database initialization failed: {0}")]
    Database(#[from] DbError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the full router.
///
/// 1. `/health`: no token
/// 2. read routes: `user` or `admin` token
/// 3. write routes: `admin` token
pub fn router(state: ApiState, signer: TokenSigner, request_timeout: Duration) -> Router {
    let reads = read_routes().route_layer(middleware::from_fn_with_state(
        RoleGuard::new(signer.clone(), Role::User),
        require_role,
    ));
    let writes = write_routes().route_layer(middleware::from_fn_with_state(
        RoleGuard::new(signer, Role::Admin),
        require_role,
    ));

    let routes = Router::new()
        .merge(public_routes())
        .merge(reads)
        .merge(writes)
        .with_state(state);

    with_layers(routes, request_timeout)
}

/// Wrap routes in the timeout, request logging and CORS layers.
fn with_layers(routes: Router, request_timeout: Duration) -> Router {
    routes
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(middleware::from_fn(timeout_envelope))
        .layer(middleware::from_fn(log_requests))
        .layer(CorsLayer::permissive())
}

/// Give the timeout layer's empty 408 the standard error body.
async fn timeout_envelope(request: Request<Body>, next: Next) -> Response {
    let response = next.run(request).await;
    if response.status() == StatusCode::REQUEST_TIMEOUT
        && !response.headers().contains_key(header::CONTENT_TYPE)
    {
        return error_response(
            StatusCode::REQUEST_TIMEOUT,
            &AppError::unspecified("request timed out"),
        );
    }
    response
}

/// Log method, path, status and latency of every request.
async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let mut response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis();
    if status.is_server_error() {
        log::error!("[{}] {} {} -> {} ({} ms)", request_id, method, path, status, elapsed_ms);
    } else if status.is_client_error() {
        log::warn!("[{}] {} {} -> {} ({} ms)", request_id, method, path, status, elapsed_ms);
    } else {
        log::info!("[{}] {} {} -> {} ({} ms)", request_id, method, path, status, elapsed_ms);
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Initialize the database and serve the API until `shutdown` is cancelled.
pub async fn run(config: &AppConfig, shutdown: CancellationToken) -> Result<(), ServerError> {
    let pool = db::initialize(&config.database_path, config.max_connections).await?;
    let state = ApiState::new(Transactor::new(pool.clone()));
    let app = router(
        state,
        TokenSigner::new(&config.token_secret),
        Duration::from_secs(config.request_timeout_secs),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .map_err(|source| ServerError::Bind {
            address: config.bind_address.clone(),
            source,
        })?;

    log::info!(
        "review API listening on http://{} (database {})",
        listener.local_addr()?,
        config.database_path.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
        })
        .await?;

    pool.close().await;
    log::info!("review API stopped");
    Ok(())
}
