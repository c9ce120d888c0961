//! # مدل‌های ورود با کد یکبار مصرف
//!
//! ```text
//! POST /api/auth/otp     {phone}         -> OtpSentResponse
//! POST /api/auth/verify  {phone, code}   -> LoginResponse
//! POST /api/auth/refresh (Bearer token)  -> TokenResponse
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::UserResponse;

// =====================================
// Requests
// =====================================
/// درخواست ارسال کد
///
/// شکل دقیق شماره در سرویس نرمال و بررسی میشه.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendOtpRequest {
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
}

/// درخواست تایید کد
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,

    #[validate(length(min = 1, message = "code is required"))]
    pub code: String,
}

// =====================================
// Cache Entry
// =====================================
/// کد در انتظار تایید، ذخیره‌شده در `otp:{phone}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpEntry {
    pub code: String,

    /// تعداد تلاش‌های ناموفق
    pub attempts: u32,

    /// زمان صدور (Unix timestamp)
    pub issued_at: i64,
}

impl OtpEntry {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            attempts: 0,
            issued_at: Utc::now().timestamp(),
        }
    }

    /// کلید کش برای یک شماره
    #[must_use]
    pub fn cache_key(phone: &str) -> String {
        format!("otp:{phone}")
    }

    /// ثانیه‌های باقی‌مونده تا انقضا (حداقل ۱)
    #[must_use]
    pub fn remaining_secs(&self, ttl_secs: u64) -> u64 {
        let elapsed = u64::try_from(Utc::now().timestamp() - self.issued_at).unwrap_or(0);
        ttl_secs.saturating_sub(elapsed).max(1)
    }
}

// =====================================
// Responses
// =====================================
/// پاسخ ارسال کد
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpSentResponse {
    /// شماره با وسط پنهان
    pub phone: String,

    /// اعتبار کد (ثانیه)
    pub expires_in: u64,
}

/// پاسخ ورود موفق
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub token: String,
    pub expires_at: DateTime<Utc>,

    /// کاربر همین الان ساخته شد؟
    pub is_new_user: bool,
}

/// پاسخ تمدید توکن
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

// =====================================
// JWT Claims
// =====================================
/// محتویات توکن JWT
///
/// # مفاهیم:
/// - `sub`: Subject (شناسه کاربر)
/// - `exp`: Expiration time (Unix timestamp)
/// - `iat`: Issued at (زمان صدور)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub phone: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// ساخت claims؛ انقضای خارج از بازه‌ی `DateTime` به بیشترین مقدار ممکن میرسه
    #[must_use]
    pub fn new(user_id: &str, phone: &str, expiration_hours: u64) -> Self {
        let now = Utc::now();
        let exp = i64::try_from(expiration_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            sub: user_id.to_string(),
            phone: phone.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }

    /// آیا توکن منقضی شده؟
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// زمان انقضا به صورت DateTime
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_entry_remaining() {
        let mut entry = OtpEntry::new("1234");
        assert_eq!(entry.remaining_secs(120), 120);

        entry.issued_at -= 30;
        assert_eq!(entry.remaining_secs(120), 90);

        entry.issued_at -= 1_000;
        assert_eq!(entry.remaining_secs(120), 1);
    }

    #[test]
    fn test_cache_keys() {
        assert_eq!(OtpEntry::cache_key("09121234567"), "otp:09121234567");
    }

    #[test]
    fn test_claims_expiry() {
        let claims = Claims::new("u1", "09121234567", 24);
        assert!(!claims.is_expired());
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
        assert_eq!(claims.expires_at().timestamp(), claims.exp);
    }

    #[test]
    fn test_claims_huge_expiry_saturates() {
        for hours in [u64::MAX, i64::MAX as u64, 1_000_000_000_000_000] {
            let claims = Claims::new("u1", "09121234567", hours);
            assert_eq!(claims.exp, DateTime::<Utc>::MAX_UTC.timestamp());
            assert!(!claims.is_expired());
        }
    }
}
