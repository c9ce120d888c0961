//! # ماژول تنظیمات (Configuration)
//!
//! این ماژول مسئول خوندن و مدیریت تنظیمات برنامه هست.
//!
//! ## مفاهیم Rust:
//! - **Structs تودرتو**: تنظیمات هر زیرسیستم در struct خودش
//! - **Default Trait**: مقادیر پیش‌فرض
//! - **Serde**: سریالایز/دسریالایز
//! - **Builder Pattern**: ساخت تدریجی آبجکت
//!
//! ## متغیرهای محیطی
//!
//! | متغیر | پیش‌فرض |
//! |---|---|
//! | `HOST` / `PORT` | `127.0.0.1` / `3000` |
//! | `DATABASE_URL` | `sqlite://data/shop.db?mode=rwc` |
//! | `CACHE_DRIVER` | `redis` (`memory` برای توسعه) |
//! | `REDIS_URL` | `redis://127.0.0.1:6379/0` |
//! | `CACHE_LOCK_NAME` | `shop:lock` |
//! | `JWT_SECRET` / `JWT_EXPIRATION_HOURS` | - / `24` |
//! | `OTP_LENGTH` / `OTP_TTL_SECONDS` / `OTP_MAX_ATTEMPTS` | `6` / `120` / `5` |
//! | `USER_CACHE_TTL_SECONDS` | `300` |
//! | `SMS_DRIVER` | `log` (`kavenegar` برای ارسال واقعی) |
//! | `SMS_API_KEY` / `SMS_SENDER` / `SMS_OTP_TEMPLATE` / `SMS_BASE_URL` | |
//! | `LOG_LEVEL` / `LOG_FORMAT` / `LOG_FILE` | `info` / `pretty` / - |
//! | `ENVIRONMENT` | `development` |

use std::{env, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    logger::LogFormat,
};

/// کلید پیش‌فرض JWT که در production حتما باید عوض بشه
pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

/// سقف اعتبار توکن: یک سال
pub const MAX_JWT_EXPIRATION_HOURS: u64 = 24 * 365;

/// تنظیمات اصلی برنامه
///
/// # مثال
/// ```rust
/// use shop_backend::config::Config;
///
/// let config = Config::default();
/// println!("Port: {}", config.port);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// آدرس هاست سرور
    pub host: String,

    /// پورت سرور
    pub port: u16,

    /// آدرس اتصال به دیتابیس
    pub database_url: String,

    /// کلید مخفی JWT
    pub jwt_secret: String,

    /// مدت اعتبار توکن JWT (ساعت)
    pub jwt_expiration_hours: u64,

    pub cache: CacheConfig,
    pub otp: OtpConfig,
    pub sms: SmsConfig,
    pub log: LogConfig,

    /// محیط اجرا (development, production)
    pub environment: Environment,
}

/// محیط اجرای برنامه
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// محیط توسعه - با قابلیت‌های دیباگ
    #[default]
    Development,

    /// محیط تست
    Testing,

    /// محیط تولید - بهینه‌سازی شده
    Production,
}

impl Environment {
    /// آیا در محیط توسعه هستیم؟
    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    /// آیا در محیط تولید هستیم؟
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// تبدیل String به Environment
impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "testing" | "test" => Environment::Testing,
            _ => Environment::Development,
        }
    }
}

// =====================================
// Sub-configs
// =====================================
/// نوع درایور کش
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheDriverKind {
    #[default]
    Redis,
    /// درایور درون حافظه؛ فقط برای توسعه و تست (قفلش توزیع‌شده نیست)
    Memory,
}

impl From<String> for CacheDriverKind {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "memory" | "mock" | "inmemory" => CacheDriverKind::Memory,
            _ => CacheDriverKind::Redis,
        }
    }
}

/// تنظیمات کش و قفل توزیع‌شده
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub driver: CacheDriverKind,
    pub redis_url: String,

    /// حداکثر اتصالات pool
    pub pool_size: usize,

    /// نام کلید mutex در Redis
    pub lock_name: String,

    /// مدت اعتبار قفل (میلی‌ثانیه)
    pub lock_expiry_ms: u64,

    /// تعداد تلاش برای گرفتن قفل
    pub lock_tries: u32,

    /// فاصله‌ی بین تلاش‌ها (میلی‌ثانیه)
    pub lock_retry_delay_ms: u64,

    /// مدت نگهداری پروفایل کاربر در کش (ثانیه)
    pub user_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            driver: CacheDriverKind::Redis,
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            pool_size: 16,
            lock_name: "shop:lock".to_string(),
            lock_expiry_ms: 8_000,
            lock_tries: 32,
            lock_retry_delay_ms: 500,
            user_ttl_secs: 300,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn lock_expiry(&self) -> Duration {
        Duration::from_millis(self.lock_expiry_ms)
    }

    #[must_use]
    pub fn lock_retry_delay(&self) -> Duration {
        Duration::from_millis(self.lock_retry_delay_ms)
    }

    #[must_use]
    pub fn user_ttl(&self) -> Duration {
        Duration::from_secs(self.user_ttl_secs)
    }
}

/// تنظیمات کد یکبار مصرف
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    /// تعداد ارقام کد
    pub length: usize,

    /// مدت اعتبار کد (ثانیه)
    pub ttl_secs: u64,

    /// حداکثر تلاش اشتباه قبل از ابطال کد
    pub max_attempts: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            length: crate::utils::DEFAULT_OTP_LENGTH,
            ttl_secs: 120,
            max_attempts: 5,
        }
    }
}

impl OtpConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// نوع درایور پیامک
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SmsDriverKind {
    /// فقط لاگ میکنه، چیزی ارسال نمیشه
    #[default]
    Log,
    Kavenegar,
}

impl From<String> for SmsDriverKind {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "kavenegar" => SmsDriverKind::Kavenegar,
            _ => SmsDriverKind::Log,
        }
    }
}

/// تنظیمات پیامک
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub driver: SmsDriverKind,
    pub api_key: String,

    /// شماره‌ی خط ارسال
    pub sender: String,

    /// نام قالب verify/lookup؛ اگه خالی باشه کد با پیامک معمولی میره
    pub otp_template: Option<String>,

    pub base_url: String,

    /// timeout درخواست HTTP (ثانیه)
    pub timeout_secs: u64,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            driver: SmsDriverKind::Log,
            api_key: String::new(),
            sender: String::new(),
            otp_template: None,
            base_url: "https://api.kavenegar.com".to_string(),
            timeout_secs: 10,
        }
    }
}

/// تنظیمات لاگ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// سطح یا فیلتر tracing
    pub level: String,
    pub format: LogFormat,

    /// فایل اضافه برای لاگ (کنار stdout)
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "shop_backend=debug,tower_http=debug,info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

/// مقادیر پیش‌فرض برای Config
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_url: "sqlite://data/shop.db?mode=rwc".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_expiration_hours: 24,
            cache: CacheConfig::default(),
            otp: OtpConfig::default(),
            sms: SmsConfig::default(),
            log: LogConfig::default(),
            environment: Environment::Development,
        }
    }
}

impl Config {
    /// ساخت تنظیمات از متغیرهای محیطی
    ///
    /// # Errors
    /// خطا برمیگردونه اگه تنظیمات نهایی معتبر نباشن
    ///
    /// # مثال
    /// ```rust,no_run
    /// use shop_backend::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// ```
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        // helper برای خوندن متغیر محیطی با default
        let get_env = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        // helper برای متغیرهای اختیاری؛ مقدار خالی یعنی None
        let opt_env = |key: &str| -> Option<String> {
            env::var(key).ok().filter(|v| !v.trim().is_empty())
        };

        // helper برای parse کردن عدد
        fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
            env::var(key)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        let config = Self {
            host: get_env("HOST", &defaults.host),
            port: parse_env("PORT", defaults.port),
            database_url: get_env("DATABASE_URL", &defaults.database_url),
            jwt_secret: get_env("JWT_SECRET", DEFAULT_JWT_SECRET),
            jwt_expiration_hours: parse_env("JWT_EXPIRATION_HOURS", defaults.jwt_expiration_hours),
            cache: CacheConfig {
                driver: get_env("CACHE_DRIVER", "redis").into(),
                redis_url: get_env("REDIS_URL", &defaults.cache.redis_url),
                pool_size: parse_env("REDIS_POOL_SIZE", defaults.cache.pool_size),
                lock_name: get_env("CACHE_LOCK_NAME", &defaults.cache.lock_name),
                lock_expiry_ms: parse_env("CACHE_LOCK_EXPIRY_MS", defaults.cache.lock_expiry_ms),
                lock_tries: parse_env("CACHE_LOCK_TRIES", defaults.cache.lock_tries),
                lock_retry_delay_ms: parse_env(
                    "CACHE_LOCK_RETRY_DELAY_MS",
                    defaults.cache.lock_retry_delay_ms,
                ),
                user_ttl_secs: parse_env("USER_CACHE_TTL_SECONDS", defaults.cache.user_ttl_secs),
            },
            otp: OtpConfig {
                length: parse_env("OTP_LENGTH", defaults.otp.length),
                ttl_secs: parse_env("OTP_TTL_SECONDS", defaults.otp.ttl_secs),
                max_attempts: parse_env("OTP_MAX_ATTEMPTS", defaults.otp.max_attempts),
            },
            sms: SmsConfig {
                driver: get_env("SMS_DRIVER", "log").into(),
                api_key: get_env("SMS_API_KEY", ""),
                sender: get_env("SMS_SENDER", ""),
                otp_template: opt_env("SMS_OTP_TEMPLATE"),
                base_url: get_env("SMS_BASE_URL", &defaults.sms.base_url),
                timeout_secs: parse_env("SMS_TIMEOUT_SECONDS", defaults.sms.timeout_secs),
            },
            log: LogConfig {
                level: get_env("LOG_LEVEL", &defaults.log.level),
                format: get_env("LOG_FORMAT", "pretty").into(),
                file: opt_env("LOG_FILE").map(PathBuf::from),
            },
            environment: get_env("ENVIRONMENT", "development").into(),
        };

        config.validate()?;
        Ok(config)
    }

    /// اعتبارسنجی تنظیمات
    ///
    /// # Errors
    /// `AppError::Config` با توضیح اولین مشکل
    pub fn validate(&self) -> Result<()> {
        if self.environment.is_production() && self.jwt_secret == DEFAULT_JWT_SECRET {
            return Err(AppError::Config(
                "JWT_SECRET must be changed in production".to_string(),
            ));
        }

        if self.environment.is_production() && self.sms.driver == SmsDriverKind::Log {
            return Err(AppError::Config(
                "SMS_DRIVER=log prints login codes and is not allowed in production".to_string(),
            ));
        }

        if !(1..=MAX_JWT_EXPIRATION_HOURS).contains(&self.jwt_expiration_hours) {
            return Err(AppError::Config(format!(
                "JWT_EXPIRATION_HOURS must be between 1 and {MAX_JWT_EXPIRATION_HOURS}"
            )));
        }

        if self.port == 0 {
            return Err(AppError::Config("PORT cannot be 0".to_string()));
        }

        if !(4..=10).contains(&self.otp.length) {
            return Err(AppError::Config(
                "OTP_LENGTH must be between 4 and 10".to_string(),
            ));
        }

        if self.otp.ttl_secs == 0 || self.otp.max_attempts == 0 {
            return Err(AppError::Config(
                "OTP_TTL_SECONDS and OTP_MAX_ATTEMPTS must be positive".to_string(),
            ));
        }

        if self.sms.driver == SmsDriverKind::Kavenegar && self.sms.api_key.is_empty() {
            return Err(AppError::Config(
                "SMS_API_KEY is required for the kavenegar driver".to_string(),
            ));
        }

        if self.cache.lock_tries == 0 {
            return Err(AppError::Config("CACHE_LOCK_TRIES cannot be 0".to_string()));
        }

        Ok(())
    }

    /// آدرس کامل سرور
    #[must_use]
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =====================================
// Builder Pattern
// =====================================
/// ساخت Config با Builder Pattern
///
/// # مثال
/// ```rust
/// use shop_backend::config::{CacheDriverKind, ConfigBuilder};
///
/// let config = ConfigBuilder::new()
///     .port(8080)
///     .cache_driver(CacheDriverKind::Memory)
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// ساخت builder جدید
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    #[must_use]
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = url.into();
        self
    }

    #[must_use]
    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt_secret = secret.into();
        self
    }

    #[must_use]
    pub fn cache_driver(mut self, driver: CacheDriverKind) -> Self {
        self.config.cache.driver = driver;
        self
    }

    #[must_use]
    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.cache.redis_url = url.into();
        self
    }

    #[must_use]
    pub fn otp(mut self, otp: OtpConfig) -> Self {
        self.config.otp = otp;
        self
    }

    #[must_use]
    pub fn sms(mut self, sms: SmsConfig) -> Self {
        self.config.sms = sms;
        self
    }

    #[must_use]
    pub fn log(mut self, log: LogConfig) -> Self {
        self.config.log = log;
        self
    }

    /// تنظیم محیط
    #[must_use]
    pub fn environment(mut self, env: Environment) -> Self {
        self.config.environment = env;
        self
    }

    /// ساخت Config نهایی
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }

    /// ساخت Config با اعتبارسنجی
    ///
    /// # Errors
    /// خطا برمیگردونه اگه اعتبارسنجی fail بشه
    pub fn build_validated(self) -> Result<Config> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
