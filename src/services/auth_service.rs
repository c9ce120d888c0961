//! # سرویس احراز هویت (Authentication Service)
//!
//! ورود با کد یکبار مصرف (OTP) و صدور JWT.
//!
//! ## جریان ورود
//! ```text
//! send_otp(phone)
//!   └─ otp:{phone} = {code, attempts: 0}   (TTL = otp.ttl)
//!   └─ SMS
//! verify_otp(phone, code)
//!   ├─ کد غلط   -> attempts + 1 -> 401 (یا 403 و حذف کد بعد از max_attempts)
//!   └─ کد درست  -> حذف کد -> find_or_create -> JWT
//! ```
//!
//! کل بررسی کد (خوندن، شمارش تلاش، حذف) و `find_or_create` زیر قفل سراسری
//! کش انجام میشه: تلاش‌های اشتباه همزمان همه شمرده میشن و دو تایید همزمان
//! برای یک شماره‌ی جدید دو کاربر نمیسازن.

use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::json;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::{
    cache::{CacheDriver, CacheDriverExt},
    config::Config,
    database::{Repository, UserRepository},
    error::{AppError, OptionExt, Result},
    models::{
        Claims, LoginResponse, OtpEntry, OtpSentResponse, SendOtpRequest, TokenResponse, User,
        VerifyOtpRequest,
    },
    sms::SmsDriver,
    utils::{mask_phone, normalize_otp, normalize_phone, random_digits},
};

use super::Service;

// =====================================
// Auth Service
// =====================================
/// سرویس احراز هویت
#[derive(Clone)]
pub struct AuthService {
    repo: UserRepository,
    cache: Arc<dyn CacheDriver>,
    sms: Arc<dyn SmsDriver>,
    config: Arc<Config>,
}

impl Service for AuthService {}

impl AuthService {
    #[must_use]
    pub fn new(
        repo: UserRepository,
        cache: Arc<dyn CacheDriver>,
        sms: Arc<dyn SmsDriver>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            repo,
            cache,
            sms,
            config,
        }
    }

    /// ارسال کد ورود
    ///
    /// # Errors
    /// - `Validation` اگه شماره معتبر نباشه
    /// - `BadRequest` با `data.retry_after` اگه کد قبلی هنوز معتبره
    /// - خطای کش یا پیامک (500)
    #[instrument(skip(self, request))]
    pub async fn send_otp(&self, request: SendOtpRequest) -> Result<OtpSentResponse> {
        request.validate()?;
        let phone = parse_phone(&request.phone)?;
        let key = OtpEntry::cache_key(&phone);
        let ttl_secs = self.config.otp.ttl_secs;

        if let Some(pending) = self.cache.get_object::<OtpEntry>(&key).await? {
            return Err(AppError::bad_request("a code was already sent, try again later")
                .with_data(json!({ "retry_after": pending.remaining_secs(ttl_secs) })));
        }

        let code = random_digits(self.config.otp.length);
        self.cache
            .set_value(&key, &OtpEntry::new(&code), Some(self.config.otp.ttl()))
            .await?;

        if let Err(e) = self.sms.send_otp(&phone, &code).await {
            // بدون پیامک، کد ذخیره‌شده فقط جلوی درخواست دوباره رو میگیره
            self.discard(&key).await;
            return Err(e.into());
        }

        info!(phone = %mask_phone(&phone), "OTP sent");
        Ok(OtpSentResponse {
            phone: mask_phone(&phone),
            expires_in: ttl_secs,
        })
    }

    /// تایید کد و ورود (یا ثبت‌نام خودکار)
    ///
    /// # Errors
    /// - `Validation` برای شماره یا کد با فرمت غلط
    /// - `BadRequest` اگه کدی در انتظار نباشه
    /// - `Unauthorized` برای کد اشتباه
    /// - `Forbidden` بعد از `max_attempts` تلاش اشتباه یا حساب غیرفعال
    #[instrument(skip(self, request))]
    pub async fn verify_otp(&self, request: VerifyOtpRequest) -> Result<LoginResponse> {
        request.validate()?;
        let phone = parse_phone(&request.phone)?;
        let code = normalize_otp(&request.code)
            .ok_or_else(|| AppError::field_error("code", "code must be 4-10 digits"))?;

        // بررسی کد و ساخت کاربر زیر قفل سراسری کش؛ تلاش‌های همزمان به ترتیب
        // شمرده میشن و کد مصرف‌شده دوباره نوشته نمیشه
        self.cache.lock().await?;
        let result = self.consume_code(&phone, &code).await;
        if let Err(e) = self.cache.unlock().await {
            warn!(error = %e, "Failed to release cache lock");
        }
        let (user, is_new_user) = result?;

        if !user.is_active {
            return Err(AppError::forbidden("account is deactivated"));
        }

        let (token, claims) = self.generate_token(&user)?;
        info!(user_id = %user.id, is_new_user, "User logged in");

        Ok(LoginResponse {
            user: user.into(),
            token,
            expires_at: claims.expires_at(),
            is_new_user,
        })
    }

    /// اعتبارسنجی توکن JWT
    ///
    /// # Errors
    /// `Unauthorized` اگه امضا یا انقضا مشکل داشته باشه
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let decoding_key = DecodingKey::from_secret(self.config.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| AppError::unauthorized("invalid token").with_cause(e))?;

        if token_data.claims.is_expired() {
            return Err(AppError::unauthorized("token expired"));
        }

        Ok(token_data.claims)
    }

    /// صدور توکن جدید با توکن معتبر فعلی
    ///
    /// # Errors
    /// - `Unauthorized` برای توکن نامعتبر
    /// - `NotFound` اگه کاربر حذف شده باشه
    /// - `Forbidden` برای حساب غیرفعال
    pub async fn refresh_token(&self, token: &str) -> Result<TokenResponse> {
        let claims = self.verify_token(token)?;

        let user = self
            .repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or_not_found("user not found")?;

        if !user.is_active {
            return Err(AppError::forbidden("account is deactivated"));
        }

        let (token, claims) = self.generate_token(&user)?;
        Ok(TokenResponse {
            token,
            expires_at: claims.expires_at(),
        })
    }

    /// مقایسه‌ی کد با کد در انتظار و در صورت درستی، find_or_create
    ///
    /// فقط زیر قفل کش صدا زده میشه.
    async fn consume_code(&self, phone: &str, code: &str) -> Result<(User, bool)> {
        let key = OtpEntry::cache_key(phone);

        let mut entry = self
            .cache
            .get_object::<OtpEntry>(&key)
            .await?
            .ok_or_else(|| AppError::bad_request("no pending code for this phone, request a new one"))?;

        if entry.code != code {
            entry.attempts += 1;

            if entry.attempts >= self.config.otp.max_attempts {
                self.discard(&key).await;
                warn!(phone = %mask_phone(phone), "OTP revoked after too many attempts");
                return Err(AppError::forbidden("too many wrong attempts, request a new code"));
            }

            let remaining = entry.remaining_secs(self.config.otp.ttl_secs);
            self.cache
                .set_value(&key, &entry, Some(std::time::Duration::from_secs(remaining)))
                .await?;
            return Err(AppError::unauthorized("invalid code"));
        }

        // حذف موفق یعنی این درخواست صاحب کد هست
        if let Err(e) = self.cache.delete(&key).await {
            if e.is_not_found() {
                return Err(AppError::bad_request("code was already used"));
            }
            return Err(e.into());
        }

        self.repo.find_or_create(phone).await
    }

    /// حذف کد بدون اهمیت به نبودنش
    async fn discard(&self, key: &str) {
        match self.cache.delete(key).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!(error = %e, key, "Failed to delete OTP entry"),
        }
    }

    fn generate_token(&self, user: &User) -> Result<(String, Claims)> {
        let claims = Claims::new(&user.id, &user.phone, self.config.jwt_expiration_hours);
        let encoding_key = EncodingKey::from_secret(self.config.jwt_secret.as_bytes());
        let token = encode(&Header::default(), &claims, &encoding_key)?;

        Ok((token, claims))
    }
}

/// نرمال‌سازی شماره یا خطای اعتبارسنجی روی فیلد `phone`
fn parse_phone(raw: &str) -> Result<String> {
    normalize_phone(raw).ok_or_else(|| AppError::field_error("phone", "invalid mobile number"))
}

// =====================================
// Token Utilities
// =====================================
/// استخراج توکن از header Authorization
///
/// # Format
/// `Authorization: Bearer <token>`
#[must_use]
pub fn extract_token_from_header(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
