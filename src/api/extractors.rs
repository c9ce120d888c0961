//! # Custom Extractors
//!
//! Extractor‌های سفارشی برای استخراج داده از request
//!
//! ## مفاهیم Rust + Axum:
//! - **FromRequestParts**: extractor‌هایی که به body دست نمیزنن
//! - **FromRequest**: extractor‌ی که body رو مصرف میکنه (فقط آخرین پارامتر)
//! - **Rejection**: نوع خطا برای extractors؛ اینجا همیشه `AppError`

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::{
    error::AppError, logger::Logger, services::AppState,
    services::extract_token_from_header,
};

/// نام header شناسه‌ی درخواست
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// =====================================
// Bearer Token Extractor
// =====================================
/// استخراج توکن از header Authorization
///
/// # استفاده در handler:
/// ```rust,ignore
/// async fn handler(BearerToken(token): BearerToken) -> ... {}
/// ```
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing authorization header"))?;

        let token = extract_token_from_header(auth_header)
            .ok_or_else(|| AppError::unauthorized("invalid authorization header format"))?;

        Ok(BearerToken(token.to_string()))
    }
}

// =====================================
// Auth User Extractor
// =====================================
/// شناسه‌ی کاربر احراز هویت شده؛ اگه توکن نامعتبر باشه 401 برمیگرده
///
/// # استفاده:
/// ```rust,ignore
/// async fn handler(AuthUser(user_id): AuthUser) -> ... {}
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let claims = state.auth_service.verify_token(&token)?;

        Ok(AuthUser(claims.sub))
    }
}

// =====================================
// Request ID
// =====================================
/// شناسه‌ی درخواست
///
/// middleware `request_id` اون رو در extensions میذاره؛ اگه نباشه از header
/// خونده یا تازه ساخته میشه.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    #[must_use]
    pub fn generate() -> Self {
        Self(nanoid::nanoid!(12))
    }

    fn from_parts(parts: &Parts) -> Self {
        if let Some(id) = parts.extensions.get::<RequestId>() {
            return id.clone();
        }

        parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| is_valid_request_id(v))
            .map_or_else(Self::generate, |v| Self(v.to_string()))
    }
}

/// شناسه‌ی ورودی فقط اگه کوتاه و از کاراکترهای امن باشه پذیرفته میشه
pub(crate) fn is_valid_request_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestId {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

// =====================================
// Request Context
// =====================================
/// اطلاعات درخواست به همراه یک Logger با فیلدهای همین درخواست
///
/// ```rust,ignore
/// async fn handler(ctx: RequestContext) {
///     ctx.logger.info("something happened"); // request_id=... method=... path=...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub logger: Logger,
}

impl RequestContext {
    #[must_use]
    pub fn from_parts(parts: &Parts) -> Self {
        let RequestId(request_id) = RequestId::from_parts(parts);
        let method = parts.method.to_string();
        let path = parts.uri.path().to_string();

        let logger = Logger::new().with_fields([
            ("request_id", request_id.as_str()),
            ("method", method.as_str()),
            ("path", path.as_str()),
        ]);

        Self {
            request_id,
            method,
            path,
            logger,
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

// =====================================
// JSON with Validation
// =====================================
/// استخراج JSON با اعتبارسنجی خودکار
///
/// - JSON خراب یا Content-Type اشتباه -> 400
/// - قوانین `validator` رعایت نشده -> 422 با `errors` فیلد به فیلد
///
/// # استفاده:
/// ```rust,ignore
/// async fn handler(ValidatedJson(data): ValidatedJson<SendOtpRequest>) -> ... {}
/// ```
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await?;
        data.validate()?;

        Ok(ValidatedJson(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_request_context_fields() {
        let parts = parts(
            HttpRequest::builder()
                .method("POST")
                .uri("/api/auth/otp?x=1")
                .header(REQUEST_ID_HEADER, "abc-123"),
        );

        let ctx = RequestContext::from_parts(&parts);

        assert_eq!(ctx.request_id, "abc-123");
        assert_eq!(ctx.path, "/api/auth/otp");
        assert_eq!(
            ctx.logger.render_fields(),
            "request_id=abc-123 method=POST path=/api/auth/otp"
        );
    }

    #[test]
    fn test_request_id_prefers_extension() {
        let mut parts = parts(HttpRequest::builder().header(REQUEST_ID_HEADER, "from-header"));
        parts.extensions.insert(RequestId("from-middleware".into()));

        assert_eq!(RequestId::from_parts(&parts).0, "from-middleware");
    }

    #[test]
    fn test_unsafe_request_id_is_replaced() {
        let parts = parts(HttpRequest::builder().header(REQUEST_ID_HEADER, "bad id\twith space"));

        let id = RequestId::from_parts(&parts);
        assert_ne!(id.0, "bad id\twith space");
        assert_eq!(id.0.len(), 12);
    }

    #[tokio::test]
    async fn test_bearer_token() {
        let mut parts = parts(HttpRequest::builder().header("authorization", "Bearer t0k3n"));
        let BearerToken(token) = BearerToken::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(token, "t0k3n");

        let mut parts = parts_without_auth();
        let err = BearerToken::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    fn parts_without_auth() -> Parts {
        parts(HttpRequest::builder())
    }
}
