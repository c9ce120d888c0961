//! # درایور Redis
//!
//! پیاده‌سازی [`CacheDriver`] روی Redis با connection pool (`deadpool-redis`).
//!
//! | عملیات | دستور Redis |
//! |---|---|
//! | set | `SET key value [PX ms]` |
//! | get | `GET key` |
//! | get_by_pattern | `SCAN ... MATCH prefix*` + `MGET` |
//! | delete | `DEL key` |
//! | delete_by_pattern | `SCAN ... MATCH prefix*` + `DEL` دسته‌ای |
//! | lock / unlock | [`RedisMutex`] |
//! | reset_db | `FLUSHDB` |

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use deadpool_redis::{Config as PoolSettings, Connection, Pool, PoolConfig, Runtime, Timeouts};
use redis::AsyncCommands;
use tracing::debug;

use super::{CacheDriver, CacheError, CacheResult, RedisMutex};
use crate::config::CacheConfig;

/// تعداد پیشنهادی کلید در هر دور SCAN
const SCAN_COUNT: usize = 100;

/// حداکثر کلید در هر دستور DEL
const DELETE_BATCH: usize = 500;

/// حداکثر انتظار برای گرفتن اتصال از pool
pub const POOL_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Escape کردن کاراکترهای glob تا پیشوند به صورت لفظی match بشه
///
/// ```rust
/// use shop_backend::cache::escape_glob;
///
/// assert_eq!(escape_glob("user:1"), "user:1");
/// assert_eq!(escape_glob("a*b?[c]"), r"a\*b\?\[c\]");
/// ```
#[must_use]
pub fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// درایور Redis
pub struct RedisDriver {
    pool: Pool,
    mutex: RedisMutex,
}

impl std::fmt::Debug for RedisDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisDriver")
            .field("pool", &self.pool.status())
            .field("mutex", &self.mutex)
            .finish()
    }
}

impl RedisDriver {
    #[must_use]
    pub fn new(pool: Pool, mutex: RedisMutex) -> Self {
        Self { pool, mutex }
    }

    /// ساخت pool و mutex از تنظیمات
    ///
    /// اتصال واقعی تا اولین دستور برقرار نمیشه؛ برای بررسی از `ping` استفاده کنید.
    ///
    /// # Errors
    /// `CacheError::CreatePool` اگه آدرس نامعتبر باشه
    pub fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        let mut settings = PoolSettings::from_url(config.redis_url.clone());
        settings.pool = Some(PoolConfig {
            timeouts: Timeouts {
                wait: Some(POOL_WAIT_TIMEOUT),
                ..Timeouts::default()
            },
            ..PoolConfig::new(config.pool_size.max(1))
        });
        let pool = settings.create_pool(Some(Runtime::Tokio1))?;

        let mutex = RedisMutex::new(config.lock_name.clone())
            .with_expiry(config.lock_expiry())
            .with_tries(config.lock_tries)
            .with_retry_delay(config.lock_retry_delay());

        Ok(Self::new(pool, mutex))
    }

    async fn conn(&self) -> CacheResult<Connection> {
        Ok(self.pool.get().await?)
    }

    /// همه‌ی کلیدهای با پیشوند `prefix` با SCAN (بدون بلاک کردن سرور)
    async fn scan_keys(&self, conn: &mut Connection, prefix: &str) -> CacheResult<Vec<String>> {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(conn)
                .await?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN ممکنه یه کلید رو بیش از یک بار برگردونه
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

#[async_trait]
impl CacheDriver for RedisDriver {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let mut conn = self.conn().await?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
            cmd.arg("PX").arg(millis);
        }

        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await?;

        match &value {
            Some(_) => debug!(key, "Cache hit"),
            None => debug!(key, "Cache miss"),
        }

        Ok(value)
    }

    async fn get_by_pattern(&self, prefix: &str) -> CacheResult<BTreeMap<String, String>> {
        let mut conn = self.conn().await?;
        let keys = self.scan_keys(&mut conn, prefix).await?;

        if keys.is_empty() {
            return Ok(BTreeMap::new());
        }

        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        // کلیدی که بین SCAN و MGET منقضی شده None برمیگرده
        Ok(keys
            .into_iter()
            .zip(values)
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        let removed: u64 = conn.del(key).await?;

        if removed == 0 {
            return Err(CacheError::NotFound(key.to_string()));
        }
        Ok(())
    }

    async fn delete_by_pattern(&self, prefix: &str) -> CacheResult<u64> {
        let mut conn = self.conn().await?;
        let keys = self.scan_keys(&mut conn, prefix).await?;

        let mut removed = 0u64;
        for chunk in keys.chunks(DELETE_BATCH) {
            let batch = chunk.to_vec();
            let count: u64 = conn.del(&batch).await?;
            removed += count;
        }

        debug!(prefix, removed, "Deleted keys by prefix");
        Ok(removed)
    }

    async fn lock(&self) -> CacheResult<()> {
        self.mutex.lock(&self.pool).await
    }

    async fn unlock(&self) -> CacheResult<()> {
        self.mutex.unlock(&self.pool).await
    }

    async fn reset_db(&self) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob(""), "");
        assert_eq!(escape_glob("user:"), "user:");
        assert_eq!(escape_glob("a*"), r"a\*");
        assert_eq!(escape_glob(r"x\y"), r"x\\y");
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = CacheConfig {
            redis_url: "not a url".to_string(),
            ..CacheConfig::default()
        };

        assert!(matches!(
            RedisDriver::from_config(&config),
            Err(CacheError::CreatePool(_))
        ));
    }

    #[tokio::test]
    async fn test_from_config_is_lazy() {
        // ساخت pool به سرور وصل نمیشه
        let config = CacheConfig {
            redis_url: "redis://127.0.0.1:1/0".to_string(),
            ..CacheConfig::default()
        };

        let driver = RedisDriver::from_config(&config).unwrap();
        assert_eq!(driver.name(), "redis");
    }

    #[tokio::test]
    async fn test_pool_waits_are_bounded() {
        let config = CacheConfig {
            redis_url: "redis://127.0.0.1:1/0".to_string(),
            pool_size: 0,
            ..CacheConfig::default()
        };

        let driver = RedisDriver::from_config(&config).unwrap();
        assert_eq!(driver.pool.status().max_size, 1);
        assert_eq!(driver.pool.timeouts().wait, Some(POOL_WAIT_TIMEOUT));
    }
}
