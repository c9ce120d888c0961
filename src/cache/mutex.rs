//! # قفل توزیع‌شده روی Redis
//!
//! قفل با `SET name token NX PX expiry` گرفته میشه و با یک اسکریپت Lua
//! (compare-and-delete) آزاد میشه، تا فقط صاحب token بتونه آزادش کنه.
//!
//! ## سیاست تلاش
//! `tries` بار امتحان میشه و بین تلاش‌ها `retry_delay` صبر میکنه.
//! بعد از آخرین تلاش ناموفق `LockNotAcquired` برمیگرده. انقضای قفل
//! (`expiry`) جلوی قفل یتیم رو بعد از crash میگیره.
//!
//! هر تلاش اتصال خودش رو از pool میگیره و قبل از `sleep` پس میده، پس
//! منتظرهای قفل اتصال‌های pool رو نگه نمیدارن.

use std::time::Duration;

use deadpool_redis::Pool;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{CacheError, CacheResult};

/// اسکریپت آزادسازی: فقط اگه مقدار هنوز token ما باشه حذف کن
const RELEASE_SCRIPT: &str = r#"
    if redis.call("get", KEYS[1]) == ARGV[1] then
        return redis.call("del", KEYS[1])
    else
        return 0
    end
"#;

/// Mutex توزیع‌شده با نام ثابت
#[derive(Debug)]
pub struct RedisMutex {
    name: String,
    expiry: Duration,
    tries: u32,
    retry_delay: Duration,

    /// token قفلی که این instance گرفته
    token: Mutex<Option<String>>,
}

impl RedisMutex {
    /// ساخت mutex با مقادیر پیش‌فرض (۸ ثانیه انقضا، ۳۲ تلاش، ۵۰۰ میلی‌ثانیه فاصله)
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expiry: Duration::from_secs(8),
            tries: 32,
            retry_delay: Duration::from_millis(500),
            token: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    #[must_use]
    pub fn with_tries(mut self, tries: u32) -> Self {
        self.tries = tries.max(1);
        self
    }

    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn expiry_millis(&self) -> u64 {
        u64::try_from(self.expiry.as_millis()).unwrap_or(u64::MAX).max(1)
    }

    /// گرفتن قفل
    ///
    /// # Errors
    /// - `LockNotAcquired` بعد از تموم شدن تلاش‌ها
    /// - خطای Redis بدون تغییر
    pub async fn lock(&self, pool: &Pool) -> CacheResult<()> {
        let token = nanoid::nanoid!(22);

        for attempt in 0..self.tries {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay).await;
            }

            let acquired: Option<String> = {
                let mut conn = pool.get().await?;
                redis::cmd("SET")
                    .arg(&self.name)
                    .arg(&token)
                    .arg("NX")
                    .arg("PX")
                    .arg(self.expiry_millis())
                    .query_async(&mut conn)
                    .await?
            };

            if acquired.is_some() {
                *self.token.lock().await = Some(token);
                debug!(lock = %self.name, attempt, "Acquired distributed lock");
                return Ok(());
            }
        }

        warn!(lock = %self.name, tries = self.tries, "Failed to acquire distributed lock");
        Err(CacheError::LockNotAcquired(self.name.clone()))
    }

    /// آزاد کردن قفل
    ///
    /// # Errors
    /// - `LockNotHeld` اگه این instance قفلی نگرفته یا قفل منقضی و
    ///   توسط کس دیگه‌ای گرفته شده
    pub async fn unlock(&self, pool: &Pool) -> CacheResult<()> {
        let token = self
            .token
            .lock()
            .await
            .take()
            .ok_or_else(|| CacheError::LockNotHeld(self.name.clone()))?;

        let mut conn = pool.get().await?;
        let released: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(&self.name)
            .arg(&token)
            .invoke_async(&mut conn)
            .await?;

        if released == 0 {
            return Err(CacheError::LockNotHeld(self.name.clone()));
        }

        debug!(lock = %self.name, "Released distributed lock");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_settings() {
        let mutex = RedisMutex::new("shop:lock")
            .with_expiry(Duration::from_millis(0))
            .with_tries(0)
            .with_retry_delay(Duration::from_millis(10));

        assert_eq!(mutex.name(), "shop:lock");
        assert_eq!(mutex.tries, 1);
        assert_eq!(mutex.expiry_millis(), 1);
        assert_eq!(mutex.retry_delay, Duration::from_millis(10));
    }
}
