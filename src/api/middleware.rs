//! # Middleware
//!
//! Middleware‌های سفارشی برای پردازش request/response
//!
//! ## مفاهیم:
//! - **Middleware**: کد که قبل/بعد از handler اجرا میشه
//! - **`axum::middleware::from_fn`**: ساخت middleware از یک async fn
//! - **`tracing::Instrument`**: اجرای future داخل یک span
//!
//! ## بازیابی از panic
//! `CatchPanicLayer` با [`handle_panic`] panic رو به پاسخ 500 ثابت تبدیل
//! میکنه؛ [`install_panic_hook`] محل panic و backtrace رو همون لحظه لاگ میکنه.

use std::{any::Any, backtrace::Backtrace, time::Instant};

use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, info_span, Instrument};

use super::extractors::{is_valid_request_id, RequestId, REQUEST_ID_HEADER};
use crate::error::{ErrorBody, INTERNAL_ERROR_MESSAGE};

// =====================================
// Request Timing Middleware
// =====================================
/// اندازه‌گیری زمان پردازش request
///
/// # استفاده:
/// ```rust,ignore
/// let app = Router::new()
///     .layer(axum::middleware::from_fn(request_timing));
/// ```
pub async fn request_timing(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        "Request completed"
    );

    response
}

// =====================================
// Request ID Middleware
// =====================================
/// اضافه کردن Request ID به هر request
///
/// - `X-Request-Id` ورودی اگه امن باشه حفظ میشه، وگرنه یکی ساخته میشه
/// - شناسه در extensions درخواست و header پاسخ قرار میگیره
/// - بقیه‌ی زنجیره داخل span `request` اجرا میشه، پس هر لاگی (از جمله
///   لاگ خطاهای AppError) فیلدهای request_id/method/path رو داره
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| is_valid_request_id(v))
        .map_or_else(RequestId::generate, |v| RequestId(v.to_string()));

    let span = info_span!(
        "request",
        request_id = %id.0,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let header = HeaderValue::from_str(&id.0).ok();
    request.extensions_mut().insert(id);

    let mut response = next.run(request).instrument(span).await;

    if let Some(header) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER, header);
    }

    response
}

// =====================================
// Panic Recovery
// =====================================
/// تبدیل panic داخل handler به پاسخ 500
///
/// برای `tower_http::catch_panic::CatchPanicLayer::custom`.
#[must_use]
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic_message(payload.as_ref());

    error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new(INTERNAL_ERROR_MESSAGE)),
    )
        .into_response()
}

/// متن payload یک panic (`&str` یا `String`)
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// نصب panic hook که محل panic و backtrace رو با tracing لاگ میکنه
///
/// hook قبلی هم صدا زده میشه.
pub fn install_panic_hook() {
    let previous = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_default();
        let backtrace = Backtrace::force_capture();

        error!(
            panic = %panic_message(info.payload()),
            location = %location,
            backtrace = %backtrace,
            "Panic captured"
        );

        previous(info);
    }));
}
