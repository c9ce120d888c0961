//! # Data Transfer Objects (DTOs)
//!
//! DTO‌های عمومی که در API استفاده میشن

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

// =====================================
// Generic API Responses
// =====================================
/// پاسخ موفق عمومی: `{"message", "data"}`
///
/// # مفاهیم:
/// - Generic: کار با هر نوع داده
/// - `#[serde(skip)]`: status فقط روی HTTP میره، نه در بدنه
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,

    #[serde(skip)]
    pub status: StatusCode,
}

impl<T> ApiResponse<T> {
    /// پاسخ 200 با داده
    pub fn ok(data: T) -> Self {
        Self {
            message: "ok".to_string(),
            data: Some(data),
            status: StatusCode::OK,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

// =====================================
// Health Check
// =====================================
/// پاسخ health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: bool,
    pub cache: bool,
    pub cache_driver: String,
}

impl HealthResponse {
    #[must_use]
    pub fn new(database_ok: bool, cache_ok: bool, cache_driver: &str) -> Self {
        Self {
            status: if database_ok && cache_ok { "healthy" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: database_ok,
            cache: cache_ok,
            cache_driver: cache_driver.to_string(),
        }
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.database && self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_response_shape() {
        let body = serde_json::to_value(ApiResponse::ok(json!({"id": 1}))).unwrap();
        assert_eq!(body, json!({"message": "ok", "data": {"id": 1}}));
    }

    #[test]
    fn test_health_status() {
        assert_eq!(HealthResponse::new(true, true, "memory").status, "healthy");
        assert_eq!(HealthResponse::new(true, false, "redis").status, "degraded");
    }
}
