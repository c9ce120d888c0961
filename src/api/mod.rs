//! # لایه API
//!
//! ## مفاهیم Rust + Axum:
//! - **Router**: تعریف مسیرها
//! - **Extractors**: استخراج داده از request
//! - **State**: اشتراک `AppState` بین handlers
//! - **Tower**: زیرساخت middleware
//!
//! ## ساختار URL‌ها:
//! - `POST /api/auth/otp` - ارسال کد ورود
//! - `POST /api/auth/verify` - تایید کد و دریافت توکن
//! - `POST /api/auth/refresh` - تمدید توکن
//! - `GET /api/me` - پروفایل کاربر
//! - `PATCH /api/me` - بروزرسانی پروفایل
//! - `GET /health` - Health check

mod extractors;
mod handlers;
mod middleware;

pub use extractors::*;
pub use handlers::*;
pub use middleware::*;

use std::time::Duration;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{error::AppError, services::AppState};

/// حداکثر زمان پردازش هر درخواست
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =====================================
// Router Builder
// =====================================
/// ساخت Router اصلی برنامه
///
/// ترتیب لایه‌ها از بیرون به داخل:
/// `request_id` -> `request_timing` -> trace -> catch-panic -> timeout -> compression -> cors
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .route("/health", get(handlers::health::health_check))
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .layer(axum_middleware::from_fn(request_timing))
        .layer(axum_middleware::from_fn(request_id))
        .with_state(state)
}

/// Route‌های API
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .route(
            "/me",
            get(handlers::user::get_profile).patch(handlers::user::update_profile),
        )
}

/// Route‌های احراز هویت
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/otp", post(handlers::auth::send_otp))
        .route("/verify", post(handlers::auth::verify_otp))
        .route("/refresh", post(handlers::auth::refresh_token))
}

async fn route_not_found() -> AppError {
    AppError::not_found("route not found")
}
