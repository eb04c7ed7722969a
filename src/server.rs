use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Instant;

use anyhow::Result;
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::model::ComparisonResult;
use crate::ranking::{rank, SortDirection, SortKey};
use crate::scout::Scout;

const HEALTH_PATH: &str = "/api/health";

#[derive(Clone)]
struct ApiState {
    scout: Scout,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ReleasesQuery {
    sort: Option<String>,
    direction: Option<String>,
}

/// Which requests the access log records, following `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestLogPolicy {
    All,
    ErrorsOnly,
    SkipHealth,
}

impl RequestLogPolicy {
    pub fn from_level(level: &str) -> Self {
        match level.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Self::All,
            "warn" | "error" => Self::ErrorsOnly,
            _ => Self::SkipHealth,
        }
    }

    pub fn should_log(&self, path: &str, status: StatusCode) -> bool {
        match self {
            Self::All => true,
            Self::ErrorsOnly => status.as_u16() >= 400,
            Self::SkipHealth => !path.starts_with(HEALTH_PATH),
        }
    }
}

pub fn router(scout: Scout, policy: RequestLogPolicy) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(HEALTH_PATH, get(health))
        .route("/api/v1/releases", get(releases))
        .fallback(not_found)
        .with_state(ApiState { scout })
        .layer(middleware::from_fn_with_state(policy, log_requests))
        .layer(cors)
}

pub async fn run_server(scout: Scout, addr: SocketAddr, policy: RequestLogPolicy) -> Result<()> {
    let app = router(scout.clone(), policy);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("kubescout API listening on http://{addr} ({})", scout.describe());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("kubescout API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn releases(
    State(state): State<ApiState>,
    Query(query): Query<ReleasesQuery>,
) -> Result<Json<Vec<ComparisonResult>>, ApiError> {
    let order = parse_order(&query)?;
    let results = state.scout.check_all().await.map_err(|e| {
        warn!("failed to list releases: {e:#}");
        ApiError::internal(format!("{e:#}"))
    })?;

    Ok(Json(match order {
        Some((key, direction)) => rank(&results, key, direction),
        None => results,
    }))
}

async fn not_found() -> ApiError {
    ApiError::not_found("not found")
}

fn parse_order(query: &ReleasesQuery) -> Result<Option<(SortKey, SortDirection)>, ApiError> {
    let direction = query
        .direction
        .as_deref()
        .map(SortDirection::from_str)
        .transpose()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let Some(sort) = query.sort.as_deref() else {
        if direction.is_some() {
            return Err(ApiError::bad_request("direction requires a sort key"));
        }
        return Ok(None);
    };
    let key = SortKey::from_str(sort).map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Some((key, direction.unwrap_or_default())))
}

async fn log_requests(
    State(policy): State<RequestLogPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    let status = response.status();
    if policy.should_log(&path, status) {
        let latency_ms = started.elapsed().as_millis() as u64;
        if status.is_client_error() || status.is_server_error() {
            warn!(%method, %path, status = status.as_u16(), latency_ms, "request");
        } else {
            info!(%method, %path, status = status.as_u16(), latency_ms, "request");
        }
    }
    response
}
