pub mod cache;

use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::core::{
    ProjectionError, ProjectionResult, RawProjectionRequest, normalize, simulate,
};
use cache::ResultCache;

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub port: u16,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
}

#[derive(Clone)]
pub struct AppState {
    cache: Arc<ResultCache>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            cache: Arc::new(ResultCache::new(config.cache_ttl, config.cache_capacity)),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/calculate", post(calculate_handler))
        .route("/api/health", get(health_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(config: ServerConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(&config));

    let listener = TcpListener::bind(addr).await?;
    info!(
        %addr,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        cache_capacity = config.cache_capacity,
        "lifepath HTTP API listening"
    );

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, HealthResponse { status: "ok" })
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found", None)
}

async fn calculate_handler(
    State(state): State<AppState>,
    payload: Result<Json<RawProjectionRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(raw)) => calculate_handler_impl(&state, raw),
        Err(rejection) => error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid API JSON payload: {}", rejection.body_text()),
            Some("ValidationError"),
        ),
    }
}

fn calculate_handler_impl(state: &AppState, raw: RawProjectionRequest) -> Response {
    match calculate(state, raw) {
        Ok(result) => json_response(StatusCode::OK, result.as_ref()),
        Err(err) => projection_error_response(&err),
    }
}

/// Normalizes and projects a request, consulting the result cache first.
fn calculate(
    state: &AppState,
    raw: RawProjectionRequest,
) -> Result<Arc<ProjectionResult>, ProjectionError> {
    let request = normalize(raw)?;

    let key = match serde_json::to_string(&request) {
        Ok(key) => Some(key),
        Err(e) => {
            warn!(error = %e, "request is not cacheable");
            None
        }
    };
    if let Some(hit) = key.as_deref().and_then(|key| state.cache.get(key)) {
        debug!("projection cache hit");
        return Ok(hit);
    }

    let result = Arc::new(simulate(&request)?);
    if let Some(key) = key {
        state.cache.insert(key, Arc::clone(&result));
    }
    Ok(result)
}

fn status_for(err: &ProjectionError) -> StatusCode {
    match err {
        ProjectionError::Validation(_) => StatusCode::BAD_REQUEST,
        ProjectionError::Simulation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ProjectionError::Consistency(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn projection_error_response(err: &ProjectionError) -> Response {
    let status = status_for(err);
    if status.is_server_error() {
        error!(error = %err, "projection failed consistency checks");
    } else {
        debug!(error = %err, kind = err.kind(), "projection rejected");
    }
    error_response(status, &err.to_string(), Some(err.kind()))
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str, kind: Option<&'static str>) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
            kind,
        },
    )
}

#[cfg(test)]
fn raw_request_from_json(json: &str) -> Result<RawProjectionRequest, String> {
    serde_json::from_str::<RawProjectionRequest>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))
}
