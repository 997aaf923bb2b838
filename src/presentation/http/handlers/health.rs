//! Health Check Handlers
//!
//! Provides health check endpoints for Kubernetes-style liveness and readiness probes.
//!
//! # Endpoints
//! - `GET /health` - Basic health check
//! - `GET /health/live` - Liveness probe (is the server running?)
//! - `GET /health/ready` - Readiness probe (database and job queue reachable?)

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::application::dto::response::{DependencyHealth, HealthResponse, ReadinessResponse};
use crate::infrastructure::{database, metrics};
use crate::startup::AppState;

/// Basic health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Liveness probe - the process is up and serving
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "alive",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe - returns 503 if a dependency is unavailable
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let database = check_database(&state).await;
    let queue = check_queue(&state).await;

    let mut response = ReadinessResponse {
        status: "ready",
        database,
        queue,
    };
    let status_code = if response.is_ready() {
        StatusCode::OK
    } else {
        response.status = "unavailable";
        StatusCode::SERVICE_UNAVAILABLE
    };

    let idle = state.db.num_idle();
    metrics::update_db_pool_stats(idle, state.db.size().saturating_sub(idle as u32));
    (status_code, Json(response))
}

/// `SELECT 1` round trip
async fn check_database(state: &AppState) -> DependencyHealth {
    let start = Instant::now();
    let result = database::ping(&state.db).await;
    dependency(start, None, result.map_err(|e| e.to_string()))
}

async fn check_queue(state: &AppState) -> DependencyHealth {
    let start = Instant::now();
    let result = state.queue.ping().await;
    dependency(
        start,
        Some(state.queue.backend()),
        result.map_err(|e| e.to_string()),
    )
}

fn dependency(
    start: Instant,
    backend: Option<&'static str>,
    result: Result<(), String>,
) -> DependencyHealth {
    let latency_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(()) => DependencyHealth {
            status: "up",
            latency_ms,
            backend,
            error: None,
        },
        Err(e) => {
            tracing::warn!(backend = ?backend, error = %e, "Readiness check failed");
            DependencyHealth {
                status: "down",
                latency_ms,
                backend,
                error: Some(e),
            }
        }
    }
}
