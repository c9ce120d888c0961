//! # درایور کش درون حافظه (Mock)
//!
//! برای تست‌ها و توسعه‌ی محلی. همون قرارداد [`CacheDriver`] رو پیاده میکنه
//! ولی قفلش فقط داخل همین process معنی داره.
//!
//! ## مفاهیم:
//! - `tokio::sync::RwLock`: چند خواننده همزمان، یک نویسنده
//! - `Semaphore` با یک مجوز: قفلی که `lock` دوم رو تا `unlock` معطل میکنه
//! - انقضای تنبل: کلید منقضی‌شده در خوندن نادیده گرفته میشه و هر [`PURGE_EVERY`] نوشتن
//!   یک‌بار جارو میشه

use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::sync::{RwLock, Semaphore};
use tracing::debug;

use super::{CacheDriver, CacheError, CacheResult};

const LOCK_NAME: &str = "memory";

/// هر چند نوشتن یک‌بار کلیدهای منقضی‌شده پاک میشن
pub const PURGE_EVERY: u64 = 256;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// درایور درون حافظه
#[derive(Debug)]
pub struct MemoryDriver {
    entries: RwLock<HashMap<String, Entry>>,
    mutex: Semaphore,
    locked: AtomicBool,
    writes: AtomicU64,
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDriver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            mutex: Semaphore::new(1),
            locked: AtomicBool::new(false),
            writes: AtomicU64::new(0),
        }
    }

    /// تعداد کلیدهای زنده
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// آیا قفل الان گرفته شده؟
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheDriver for MemoryDriver {
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if self.writes.fetch_add(1, Ordering::Relaxed) % PURGE_EVERY == PURGE_EVERY - 1 {
            let before = entries.len();
            entries.retain(|_, e| e.is_live(now));
            debug!(purged = before - entries.len(), "Purged expired memory entries");
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );

        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;

        Ok(entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn get_by_pattern(&self, prefix: &str) -> CacheResult<BTreeMap<String, String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;

        Ok(entries
            .iter()
            .filter(|(k, e)| k.starts_with(prefix) && e.is_live(now))
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        match entries.remove(key) {
            Some(entry) if entry.is_live(now) => Ok(()),
            _ => Err(CacheError::NotFound(key.to_string())),
        }
    }

    async fn delete_by_pattern(&self, prefix: &str) -> CacheResult<u64> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let mut removed = 0u64;

        entries.retain(|k, e| {
            if !e.is_live(now) {
                return false;
            }
            if k.starts_with(prefix) {
                removed += 1;
                return false;
            }
            true
        });

        debug!(prefix, removed, "Deleted keys by prefix");
        Ok(removed)
    }

    async fn lock(&self) -> CacheResult<()> {
        let permit = self
            .mutex
            .acquire()
            .await
            .map_err(|_| CacheError::LockNotAcquired(LOCK_NAME.to_string()))?;

        // مجوز تا unlock برنمیگرده
        permit.forget();
        self.locked.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn unlock(&self) -> CacheResult<()> {
        if !self.locked.swap(false, Ordering::SeqCst) {
            return Err(CacheError::LockNotHeld(LOCK_NAME.to_string()));
        }

        self.mutex.add_permits(1);
        Ok(())
    }

    async fn reset_db(&self) -> CacheResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheDriverExt;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Product {
        id: u32,
        title: String,
        price: u64,
        tags: Vec<String>,
    }

    #[tokio::test]
    async fn test_string_stored_verbatim() {
        let driver = MemoryDriver::new();
        driver.set_value("greeting", "سلام", None).await.unwrap();

        assert_eq!(driver.get("greeting").await.unwrap().as_deref(), Some("سلام"));
    }

    #[tokio::test]
    async fn test_object_roundtrip() {
        let driver = MemoryDriver::new();
        let product = Product {
            id: 7,
            title: "کتاب".to_string(),
            price: 250_000,
            tags: vec!["book".into(), "new".into()],
        };

        driver
            .set_value("product:7", &product, Some(Duration::from_secs(60)))
            .await
            .unwrap();

        let back: Product = driver.unmarshal_to_object("product:7").await.unwrap();
        assert_eq!(back, product);

        let numbers = vec![1u32, 2, 3];
        driver.set_value("numbers", &numbers, None).await.unwrap();
        let back: Vec<u32> = driver.unmarshal_to_object("numbers").await.unwrap();
        assert_eq!(back, numbers);
    }

    #[tokio::test]
    async fn test_delete_existing_and_missing() {
        let driver = MemoryDriver::new();
        driver.set("k", "v", None).await.unwrap();

        driver.delete("k").await.unwrap();
        assert_eq!(driver.get("k").await.unwrap(), None);

        let err = driver.delete("k").await.unwrap_err();
        assert!(matches!(err, CacheError::NotFound(key) if key == "k"));
    }

    #[tokio::test]
    async fn test_delete_by_pattern_counts_only_prefix() {
        let driver = MemoryDriver::new();
        for key in ["user:1", "user:2", "user:3:profile", "users", "order:1"] {
            driver.set(key, "x", None).await.unwrap();
        }

        let removed = driver.delete_by_pattern("user:").await.unwrap();

        assert_eq!(removed, 3);
        assert_eq!(driver.get("users").await.unwrap().as_deref(), Some("x"));
        assert_eq!(driver.get("order:1").await.unwrap().as_deref(), Some("x"));
        assert_eq!(driver.len().await, 2);
        assert_eq!(driver.delete_by_pattern("user:").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_by_pattern() {
        let driver = MemoryDriver::new();
        driver.set("cart:1", "a", None).await.unwrap();
        driver.set("cart:2", "b", None).await.unwrap();
        driver.set("wish:1", "c", None).await.unwrap();

        let found = driver.get_by_pattern("cart:").await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found.get("cart:1").map(String::as_str), Some("a"));
        assert_eq!(found.get("cart:2").map(String::as_str), Some("b"));
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let driver = MemoryDriver::new();
        driver
            .set("otp", "1234", Some(Duration::from_millis(30)))
            .await
            .unwrap();
        assert!(driver.get("otp").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(driver.get("otp").await.unwrap().is_none());
        assert!(driver.delete("otp").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_expired_entries_purged_periodically() {
        let driver = MemoryDriver::new();
        driver
            .set("otp:old", "1234", Some(Duration::from_millis(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        for i in 1..PURGE_EVERY - 1 {
            driver.set(&format!("cart:{i}"), "x", None).await.unwrap();
        }
        assert!(driver.entries.read().await.contains_key("otp:old"));
        assert_eq!(driver.len().await, (PURGE_EVERY - 2) as usize);

        driver.set("cart:last", "x", None).await.unwrap();
        let entries = driver.entries.read().await;
        assert!(!entries.contains_key("otp:old"));
        assert_eq!(entries.len(), (PURGE_EVERY - 1) as usize);
    }

    #[tokio::test]
    async fn test_reset_db() {
        let driver = MemoryDriver::new();
        driver.set("a", "1", None).await.unwrap();
        driver.set("b", "2", None).await.unwrap();

        driver.reset_db().await.unwrap();

        assert!(driver.is_empty().await);
    }

    #[tokio::test]
    async fn test_second_lock_blocks_until_unlock() {
        let driver = Arc::new(MemoryDriver::new());
        driver.lock().await.unwrap();
        assert!(driver.is_locked());

        let contender = {
            let driver = Arc::clone(&driver);
            tokio::spawn(async move {
                driver.lock().await.unwrap();
                driver.unlock().await.unwrap();
            })
        };

        // تا وقتی قفل دست اولیه، دومی نباید تموم بشه
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        driver.unlock().await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("second lock should proceed after unlock")
            .unwrap();
        assert!(!driver.is_locked());
    }

    #[tokio::test]
    async fn test_unlock_without_lock() {
        let driver = MemoryDriver::new();
        let err = driver.unlock().await.unwrap_err();
        assert!(matches!(err, CacheError::LockNotHeld(_)));
    }
}
