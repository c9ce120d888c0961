//! # ماژول دیتابیس (Database Layer)
//!
//! ## مفاهیم Rust:
//! - **Arc<T>**: اشتراک pool بین handler‌ها
//! - **async/await**: برنامه‌نویسی غیرهمزمان
//!
//! ## الگوهای طراحی:
//! - Repository Pattern: جداسازی لایه داده از منطق
//! - Connection Pool: مدیریت اتصالات دیتابیس

mod repository;

pub use repository::*;

use std::{sync::Arc, time::Duration};

use sqlx::{
    migrate::Migrator,
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use tracing::info;

use crate::error::Result;

// مسیر migration‌ها
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

// =====================================
// Database Connection
// =====================================
/// اتصال به دیتابیس با Connection Pool
///
/// هر clone فقط شمارنده‌ی `Arc` رو زیاد میکنه.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Arc<SqlitePool>,
}

impl Database {
    /// اتصال به دیتابیس
    ///
    /// # Arguments
    /// * `database_url` - آدرس دیتابیس (مثلا `sqlite://data/shop.db?mode=rwc`)
    ///
    /// # Errors
    /// خطا برمیگردونه اگه پوشه ساخته نشه یا اتصال موفق نباشه
    pub async fn connect(database_url: impl AsRef<str>) -> Result<Self> {
        let url = database_url.as_ref();

        // ساخت پوشه‌ی فایل sqlite اگه وجود نداره
        if let Some(path) = url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .connect(url)
            .await?;

        info!("Connected to database");
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// دیتابیس in-memory با migration اجرا شده، برای تست و توسعه
    ///
    /// فقط یک اتصال و بدون timeout، چون هر اتصال `:memory:` دیتابیس خودش رو داره.
    ///
    /// # Errors
    /// خطای اتصال یا migration
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let db = Self {
            pool: Arc::new(pool),
        };
        db.migrate().await?;
        Ok(db)
    }

    /// اجرای migration‌ها
    ///
    /// # Errors
    /// `AppError::Migrate` اگه migration شکست بخوره
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&*self.pool).await?;
        Ok(())
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// بررسی سلامت دیتابیس
    ///
    /// # Errors
    /// خطای sqlx اگه `SELECT 1` اجرا نشه
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&*self.pool).await?;
        Ok(())
    }
}
