//! # ماژول مدیریت خطاها (Error Handling)
//!
//! خطاهای برنامه به دو دسته تقسیم میشن:
//!
//! 1. **خطاهای typed**: مجموعه‌ی بسته‌ای از خطاهای کسب‌وکار (Validation،
//!    BadRequest، NotFound، Unauthorized، Forbidden، Internal) که هر کدوم
//!    status code و پیام خودشون رو دارن و پیامشون به کلاینت نشون داده میشه.
//! 2. **خطاهای untyped**: خطاهای کتابخانه‌ها (sqlx، redis، reqwest، ...) که
//!    همیشه به یک پاسخ 500 با پیام ثابت تبدیل میشن تا جزئیات داخلی لو نره.
//!
//! لایه‌ی HTTP تنها جاییه که خطا به پاسخ تبدیل و لاگ میشه.
//!
//! ## مفاهیم Rust:
//! - **thiserror**: derive macro برای Error trait
//! - **Struct variants**: variant با فیلدهای نام‌دار
//! - **From Trait**: تبدیل خودکار با `?`
//! - **Result Type Alias**: alias برای ساده‌تر شدن کد

use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{cache::CacheError, logger::Logger, sms::SmsError};

/// پیام ثابت برای هر خطای ناشناخته
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// پیام پیش‌فرض خطای اعتبارسنجی
pub const VALIDATION_ERROR_MESSAGE: &str = "validation failed";

/// خطای زیرین که فقط برای لاگ نگه داشته میشه
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// خطاهای فیلد به فیلد: `{field: [message, ...]}`
pub type FieldErrors = BTreeMap<String, Vec<String>>;

// =====================================
// Result Type Alias
// =====================================
/// نوع Result سفارشی برنامه
///
/// به جای نوشتن `Result<User, AppError>` میتونیم بنویسیم `Result<User>`
pub type Result<T, E = AppError> = std::result::Result<T, E>;

// =====================================
// Custom Error Enum
// =====================================
/// خطای اصلی برنامه
///
/// # مفاهیم:
/// - فیلد `cause` عمدا `source` نام‌گذاری نشده تا thiserror اون رو
///   به عنوان `Error::source` در نظر نگیره؛ فقط برای لاگ استفاده میشه.
#[derive(Debug, Error)]
pub enum AppError {
    // ----------------------------------------
    // خطاهای typed (پیامشون به کلاینت میرسه)
    // ----------------------------------------
    /// خطای اعتبارسنجی - 422
    #[error("{message}")]
    Validation { message: String, errors: FieldErrors },

    /// درخواست نامعتبر - 400
    #[error("{message}")]
    BadRequest {
        message: String,
        data: Option<Value>,
        cause: Option<BoxError>,
    },

    /// احراز هویت نشده - 401
    #[error("{message}")]
    Unauthorized {
        message: String,
        cause: Option<BoxError>,
    },

    /// دسترسی ممنوع - 403
    #[error("{message}")]
    Forbidden {
        message: String,
        cause: Option<BoxError>,
    },

    /// پیدا نشد - 404
    #[error("{message}")]
    NotFound {
        message: String,
        cause: Option<BoxError>,
    },

    /// خطای داخلی با پیام مشخص - 500
    #[error("{message}")]
    Internal {
        message: String,
        cause: Option<BoxError>,
    },

    // ----------------------------------------
    // خطاهای untyped (همیشه 500 با پیام ثابت)
    // ----------------------------------------
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("SMS error: {0}")]
    Sms(#[from] SmsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

// =====================================
// Constructors
// =====================================
impl AppError {
    /// خطای اعتبارسنجی بدون خطای فیلد
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors: FieldErrors::new(),
        }
    }

    /// خطای اعتبارسنجی برای یک فیلد
    ///
    /// ```rust
    /// use shop_backend::AppError;
    ///
    /// let err = AppError::field_error("phone", "invalid mobile number");
    /// assert_eq!(err.status_code().as_u16(), 422);
    /// ```
    #[must_use]
    pub fn field_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::validation(VALIDATION_ERROR_MESSAGE).with_field_error(field, message)
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            data: None,
            cause: None,
        }
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
            cause: None,
        }
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
            cause: None,
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            cause: None,
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            cause: None,
        }
    }

    /// ساخت خطای Not Found برای کاربر
    #[must_use]
    pub fn user_not_found(user_id: &str) -> Self {
        Self::not_found(format!("user '{user_id}' not found"))
    }

    /// اضافه کردن خطای یک فیلد (فقط روی Validation اثر داره)
    #[must_use]
    pub fn with_field_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        if let Self::Validation { errors, .. } = &mut self {
            errors.entry(field.into()).or_default().push(message.into());
        }
        self
    }

    /// اضافه کردن `data` به پاسخ (فقط روی BadRequest اثر داره)
    #[must_use]
    pub fn with_data(mut self, value: Value) -> Self {
        if let Self::BadRequest { data, .. } = &mut self {
            *data = Some(value);
        }
        self
    }

    /// نگه داشتن خطای زیرین برای لاگ
    ///
    /// روی Validation و خطاهای untyped اثری نداره.
    #[must_use]
    pub fn with_cause(mut self, err: impl Into<BoxError>) -> Self {
        match &mut self {
            Self::BadRequest { cause, .. }
            | Self::Unauthorized { cause, .. }
            | Self::Forbidden { cause, .. }
            | Self::NotFound { cause, .. }
            | Self::Internal { cause, .. } => *cause = Some(err.into()),
            _ => {}
        }
        self
    }
}

// =====================================
// Classification
// =====================================
impl AppError {
    /// گرفتن HTTP status code متناسب با خطا
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal { .. }
            | Self::Database(_)
            | Self::Migrate(_)
            | Self::Cache(_)
            | Self::Sms(_)
            | Self::Json(_)
            | Self::Io(_)
            | Self::Jwt(_)
            | Self::Config(_)
            | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// آیا این خطا جزو مجموعه‌ی typed هست؟
    #[must_use]
    pub fn is_typed(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::BadRequest { .. }
                | Self::Unauthorized { .. }
                | Self::Forbidden { .. }
                | Self::NotFound { .. }
                | Self::Internal { .. }
        )
    }

    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// پیامی که به کلاینت نشون داده میشه
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.is_typed() {
            self.to_string()
        } else {
            INTERNAL_ERROR_MESSAGE.to_string()
        }
    }

    /// خطای زیرین (برای لاگ)
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BadRequest { cause, .. }
            | Self::Unauthorized { cause, .. }
            | Self::Forbidden { cause, .. }
            | Self::NotFound { cause, .. }
            | Self::Internal { cause, .. } => cause
                .as_deref()
                .map(|c| c as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }

    /// بدنه‌ی JSON پاسخ
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        match self {
            Self::Validation { message, errors } => ErrorBody {
                message: message.clone(),
                data: None,
                errors: Some(errors.clone()),
            },
            Self::BadRequest { message, data, .. } => ErrorBody {
                message: message.clone(),
                data: data.clone(),
                errors: None,
            },
            _ => ErrorBody::new(self.public_message()),
        }
    }

    /// لاگ کردن خطا با logger داده شده؛ 4xx در سطح warn و 5xx در سطح error
    pub fn log(&self, logger: &Logger) {
        let status = self.status_code();
        let mut logger = logger
            .with_field("status", status.as_u16())
            .with_field("reason", self);

        if let Some(cause) = self.cause() {
            logger = logger.with_error(cause);
        } else if !self.is_typed() {
            // متن واقعی خطای untyped فقط در لاگ میاد
            if let Some(source) = std::error::Error::source(self) {
                logger = logger.with_error(source);
            }
        }

        if status.is_server_error() {
            logger.error("request failed");
        } else {
            logger.warn("request failed");
        }
    }

    /// تبدیل به پاسخ HTTP با logger مشخص (مثلا logger درخواست)
    #[must_use]
    pub fn respond(self, logger: &Logger) -> Response {
        self.log(logger);
        (self.status_code(), Json(self.body())).into_response()
    }
}

// =====================================
// Error Response DTO
// =====================================
/// ساختار پاسخ خطا در API
///
/// - `{"message"}` برای اکثر خطاها
/// - `{"message", "data"}` برای BadRequest با داده
/// - `{"message", "errors"}` برای Validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
            errors: None,
        }
    }
}

// =====================================
// IntoResponse Implementation
// =====================================
/// تبدیل AppError به Response HTTP
///
/// فیلدهای درخواست (request_id، method، path) از span‌ی که middleware
/// باز کرده به لاگ اضافه میشن.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.respond(&Logger::new())
    }
}

// =====================================
// From Implementations
// =====================================
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut app_err = Self::validation(VALIDATION_ERROR_MESSAGE);

        for (field, errors) in err.field_errors() {
            let field = field.to_string();
            for e in errors {
                let message = e
                    .message
                    .as_ref()
                    .map_or_else(|| format!("{field} is invalid ({})", e.code), ToString::to_string);
                app_err = app_err.with_field_error(field.clone(), message);
            }
        }

        app_err
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text()).with_cause(rejection)
    }
}

// =====================================
// Result Extensions
// =====================================
/// Extension trait برای Result
pub trait ResultExt<T, E> {
    /// تبدیل خطا به AppError::Internal با پیام ثابت و نگه داشتن خطای اصلی
    fn map_internal(self) -> Result<T>;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn map_internal(self) -> Result<T> {
        self.map_err(|e| AppError::internal(INTERNAL_ERROR_MESSAGE).with_cause(e))
    }
}

// =====================================
// Option Extensions
// =====================================
/// Extension trait برای Option
pub trait OptionExt<T> {
    /// تبدیل None به AppError::NotFound
    fn ok_or_not_found(self, message: impl Into<String>) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, message: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| AppError::not_found(message))
    }
}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use validator::Validate;

    async fn read_json(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::validation("v").status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::bad_request("b").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::unauthorized("u").status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("f").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("n").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::internal("i").status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::Config("bad".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let (status, body) = read_json(AppError::not_found("x").into_response()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"message": "x"}));
    }

    #[tokio::test]
    async fn test_untyped_error_hides_its_text() {
        let err = AppError::from(anyhow::anyhow!("connection refused at 10.0.0.3:6379"));
        let (status, body) = read_json(err.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"message": INTERNAL_ERROR_MESSAGE}));

        let err = AppError::from(CacheError::LockNotAcquired("shop:lock".into()));
        let (_, body) = read_json(err.into_response()).await;
        assert_eq!(body, json!({"message": INTERNAL_ERROR_MESSAGE}));
    }

    #[tokio::test]
    async fn test_internal_keeps_its_own_message() {
        let err = AppError::internal("payment gateway unavailable")
            .with_cause(std::io::Error::other("timeout"));
        let (status, body) = read_json(err.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"message": "payment gateway unavailable"}));
    }

    #[tokio::test]
    async fn test_bad_request_with_data() {
        let err = AppError::bad_request("otp already sent").with_data(json!({"retry_after": 42}));
        let (status, body) = read_json(err.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"message": "otp already sent", "data": {"retry_after": 42}}));
    }

    #[tokio::test]
    async fn test_validation_body() {
        let err = AppError::field_error("phone", "invalid mobile number")
            .with_field_error("phone", "required");
        let (status, body) = read_json(err.into_response()).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({
                "message": VALIDATION_ERROR_MESSAGE,
                "errors": {"phone": ["invalid mobile number", "required"]}
            })
        );
    }

    #[derive(Validate)]
    struct Signup {
        #[validate(length(min = 3, message = "name is too short"))]
        name: String,
        #[validate(range(min = 18))]
        age: u32,
    }

    #[test]
    fn test_from_validation_errors() {
        let input = Signup {
            name: "ab".into(),
            age: 10,
        };
        let err: AppError = input.validate().unwrap_err().into();

        match err {
            AppError::Validation { errors, .. } => {
                assert_eq!(errors["name"], vec!["name is too short".to_string()]);
                assert_eq!(errors["age"].len(), 1);
                assert!(errors["age"][0].starts_with("age is invalid"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_builders_ignore_other_variants() {
        let err = AppError::not_found("n").with_data(json!(1)).with_field_error("f", "m");
        assert_eq!(err.body(), ErrorBody::new("n"));
    }

    #[test]
    fn test_cause_is_kept_for_logging() {
        let err = AppError::unauthorized("invalid token").with_cause(std::io::Error::other("expired"));

        assert_eq!(err.cause().map(ToString::to_string).as_deref(), Some("expired"));
        assert_eq!(err.public_message(), "invalid token");
    }

    #[test]
    fn test_option_extension() {
        let some_value: Option<i32> = Some(42);
        let none_value: Option<i32> = None;

        assert!(some_value.ok_or_not_found("not found").is_ok());
        assert!(matches!(
            none_value.ok_or_not_found("not found"),
            Err(AppError::NotFound { .. })
        ));
    }

    #[test]
    fn test_result_extension() {
        let ok: std::result::Result<i32, std::io::Error> = Ok(42);
        let err: std::result::Result<i32, std::io::Error> = Err(std::io::Error::other("disk"));

        assert!(ok.map_internal().is_ok());
        let mapped = err.map_internal().unwrap_err();
        assert!(matches!(mapped, AppError::Internal { .. }));
        assert_eq!(mapped.public_message(), INTERNAL_ERROR_MESSAGE);
    }
}
