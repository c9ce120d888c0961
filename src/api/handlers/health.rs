//! # Health Check Handler

use axum::{extract::State, http::StatusCode};

use crate::{
    models::{ApiResponse, HealthResponse},
    services::AppState,
};

/// بررسی سلامت سرویس
///
/// دیتابیس (`SELECT 1`) و کش (`PING`) چک میشن؛ اگه یکی خراب باشه 503 برمیگرده.
///
/// # Endpoint
/// `GET /health`
///
/// # Response
/// ```json
/// {
///   "message": "healthy",
///   "data": { "status": "healthy", "version": "0.1.0", "database": true, "cache": true, "cache_driver": "redis" }
/// }
/// ```
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthResponse> {
    let health = state.health().await;

    let mut response = ApiResponse::ok(health.clone()).with_message(health.status.clone());
    if !health.is_healthy() {
        response.status = StatusCode::SERVICE_UNAVAILABLE;
    }
    response
}
