//! # ماژول کش (Cache Driver)
//!
//! لایه‌ی انتزاعی کش key-value به همراه یک قفل توزیع‌شده.
//!
//! ```text
//! ┌──────────────────┐
//! │     Services     │
//! ├──────────────────┤
//! │ CacheDriverExt   │  <-- set_value / unmarshal_to_object (JSON)
//! ├──────────────────┤
//! │   CacheDriver    │  <-- trait (dyn-compatible)
//! ├────────┬─────────┤
//! │ Redis  │ Memory  │  <-- پیاده‌سازی‌ها
//! └────────┴─────────┘
//! ```
//!
//! ## مفاهیم Rust:
//! - **async_trait**: async fn در trait‌ی که به صورت `dyn` استفاده میشه
//! - **Extension Trait + Blanket impl**: متدهای generic روی هر درایوری
//! - **Arc<dyn Trait>**: انتخاب درایور در زمان اجرا
//!
//! ## قرارداد
//! - رشته‌ها همونطور که هستن ذخیره میشن، بقیه‌ی مقادیر JSON میشن.
//! - خطای backend بدون تغییر بالا میاد؛ retry و eviction محلی نداریم.
//! - حذف الگویی (`delete_by_pattern`) اتمیک نیست: بین SCAN و DEL کلیدهای
//!   جدید با همون پیشوند ممکنه نوشته بشن و باقی بمونن، و کلیدی که همزمان
//!   حذف بشه در شمارش نمیاد.

mod memory;
mod mutex;
mod redis_driver;

pub use memory::MemoryDriver;
pub use mutex::RedisMutex;
pub use redis_driver::{escape_glob, RedisDriver};

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{CacheConfig, CacheDriverKind};

// =====================================
// Errors
// =====================================
/// نتیجه‌ی عملیات کش
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// خطاهای لایه‌ی کش
#[derive(Debug, Error)]
pub enum CacheError {
    /// کلید وجود نداره (یا هیچ کلیدی حذف نشد)
    #[error("cache key '{0}' not found")]
    NotFound(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("failed to create redis pool: {0}")]
    CreatePool(#[from] deadpool_redis::CreatePoolError),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// بعد از همه‌ی تلاش‌ها قفل گرفته نشد
    #[error("could not acquire lock '{0}'")]
    LockNotAcquired(String),

    /// قفلی برای آزاد کردن نیست یا مالکش عوض شده
    #[error("lock '{0}' is not held")]
    LockNotHeld(String),
}

impl CacheError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// =====================================
// Driver Trait
// =====================================
/// عملیاتی که هر backend کش باید پشتیبانی کنه
///
/// این trait عمدا generic method نداره تا به صورت `Arc<dyn CacheDriver>`
/// قابل استفاده باشه؛ متدهای typed در [`CacheDriverExt`] هستن.
#[async_trait]
pub trait CacheDriver: Send + Sync {
    /// ذخیره‌ی مقدار خام؛ `ttl = None` یعنی بدون انقضا
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()>;

    /// خوندن مقدار خام؛ `None` اگه نباشه یا منقضی شده باشه
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// همه‌ی مقادیری که کلیدشون با `prefix` شروع میشه
    async fn get_by_pattern(&self, prefix: &str) -> CacheResult<BTreeMap<String, String>>;

    /// حذف یک کلید
    ///
    /// # Errors
    /// `CacheError::NotFound` اگه هیچ کلیدی حذف نشه
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// حذف همه‌ی کلیدهایی که با `prefix` شروع میشن؛ تعداد حذف‌شده‌ها رو برمیگردونه
    ///
    /// اتمیک نیست (بالای ماژول رو ببینید).
    async fn delete_by_pattern(&self, prefix: &str) -> CacheResult<u64>;

    /// گرفتن قفل سراسری درایور
    async fn lock(&self) -> CacheResult<()>;

    /// آزاد کردن قفل سراسری درایور
    async fn unlock(&self) -> CacheResult<()>;

    /// پاک کردن کامل دیتابیس انتخاب‌شده
    async fn reset_db(&self) -> CacheResult<()>;

    /// بررسی سلامت backend
    async fn ping(&self) -> CacheResult<()>;

    /// نام درایور برای لاگ و health check
    fn name(&self) -> &'static str;
}

// =====================================
// Typed Helpers
// =====================================
/// تبدیل مقدار به رشته‌ی قابل ذخیره
///
/// رشته‌ها دست نمیخورن (بدون کوتیشن JSON)، بقیه JSON میشن.
///
/// ```rust
/// use shop_backend::cache::encode_value;
///
/// assert_eq!(encode_value("plain").unwrap(), "plain");
/// assert_eq!(encode_value(&vec![1, 2]).unwrap(), "[1,2]");
/// ```
///
/// # Errors
/// خطای serde_json اگه مقدار قابل سریالایز نباشه
pub fn encode_value<T: Serialize + ?Sized>(value: &T) -> CacheResult<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

/// متدهای typed روی هر [`CacheDriver`]
#[async_trait]
pub trait CacheDriverExt: CacheDriver {
    /// ذخیره‌ی هر مقدار Serialize
    async fn set_value<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let raw = encode_value(value)?;
        self.set(key, &raw, ttl).await
    }

    /// خوندن و JSON-decode کردن مقدار
    ///
    /// # Errors
    /// - `CacheError::NotFound` اگه کلید نباشه
    /// - `CacheError::Serialization` اگه مقدار با `T` جور نباشه
    async fn unmarshal_to_object<T>(&self, key: &str) -> CacheResult<T>
    where
        T: DeserializeOwned + Send,
    {
        let raw = self
            .get(key)
            .await?
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        Ok(serde_json::from_str(&raw)?)
    }

    /// مثل `unmarshal_to_object` ولی نبودن کلید خطا نیست
    async fn get_object<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.unmarshal_to_object(key).await {
            Ok(value) => Ok(Some(value)),
            Err(CacheError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// Blanket implementation برای همه‌ی درایورها، از جمله dyn CacheDriver
impl<D: CacheDriver + ?Sized> CacheDriverExt for D {}

// =====================================
// Factory
// =====================================
/// ساخت درایور بر اساس تنظیمات
///
/// # Errors
/// خطا برمیگردونه اگه pool ردیس ساخته نشه
pub fn connect(config: &CacheConfig) -> CacheResult<Arc<dyn CacheDriver>> {
    let driver: Arc<dyn CacheDriver> = match config.driver {
        CacheDriverKind::Redis => Arc::new(RedisDriver::from_config(config)?),
        CacheDriverKind::Memory => Arc::new(MemoryDriver::new()),
    };

    info!(driver = driver.name(), "Cache driver ready");
    Ok(driver)
}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Cart {
        items: Vec<String>,
        total: u64,
    }

    #[test]
    fn test_encode_value() {
        assert_eq!(encode_value("hello").unwrap(), "hello");
        assert_eq!(encode_value(&"hello".to_string()).unwrap(), "hello");
        assert_eq!(encode_value(&42).unwrap(), "42");
        assert_eq!(encode_value(&true).unwrap(), "true");

        let cart = Cart {
            items: vec!["book".into()],
            total: 120_000,
        };
        assert_eq!(encode_value(&cart).unwrap(), r#"{"items":["book"],"total":120000}"#);
    }

    #[tokio::test]
    async fn test_roundtrip_through_dyn_driver() {
        let driver: Arc<dyn CacheDriver> = Arc::new(MemoryDriver::new());
        let cart = Cart {
            items: vec!["pen".into(), "notebook".into()],
            total: 45_000,
        };

        driver.set_value("cart:1", &cart, None).await.unwrap();
        let back: Cart = driver.unmarshal_to_object("cart:1").await.unwrap();

        assert_eq!(back, cart);
    }

    #[tokio::test]
    async fn test_unmarshal_missing_key() {
        let driver = MemoryDriver::new();

        let err = driver.unmarshal_to_object::<Cart>("nope").await.unwrap_err();
        assert!(err.is_not_found());

        let none: Option<Cart> = driver.get_object("nope").await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_unmarshal_wrong_shape() {
        let driver = MemoryDriver::new();
        driver.set("cart:2", "not json", None).await.unwrap();

        let err = driver.unmarshal_to_object::<Cart>("cart:2").await.unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }

    #[test]
    fn test_connect_memory() {
        let config = CacheConfig {
            driver: CacheDriverKind::Memory,
            ..CacheConfig::default()
        };

        let driver = connect(&config).unwrap();
        assert_eq!(driver.name(), "memory");
    }
}
