/// Health check endpoint
///
/// ```text
/// GET /api/health
/// ```
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "pool": { "active": 1, "idle": 4, "total": 5 }
/// }
/// ```
///
/// A database failure reports `"degraded"` with status 503 so load
/// balancers take the instance out of rotation.

use axum::{extract::State, http::StatusCode, Json};
use hourglass_shared::db::pool::{health_check as ping, pool_stats, PoolStats};
use serde::Serialize;

use crate::app::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub pool: Option<PoolStats>,
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let connected = match ping(&state.db).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "Database health check failed");
            false
        }
    };

    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if connected { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if connected { "connected" } else { "disconnected" }.to_string(),
            pool: connected.then(|| pool_stats(&state.db)),
        }),
    )
}
