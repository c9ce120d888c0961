//! # Shop Backend Library
//!
//! بک‌اند یک فروشگاه کوچک: ورود با کد پیامکی، کش و قفل توزیع‌شده روی Redis
//! و تبدیل خطاهای typed به پاسخ HTTP.
//!
//! ## ساختار پروژه
//!
//! ```text
//! src/
//! ├── lib.rs          # نقطه ورود کتابخانه - اینجا!
//! ├── main.rs         # نقطه ورود باینری
//! ├── config/         # مدیریت تنظیمات
//! ├── logger/         # لاگر ساختاریافته (tracing)
//! ├── error/          # خطاها و تبدیل به پاسخ HTTP
//! ├── cache/          # درایور کش و قفل (Redis / Memory)
//! ├── sms/            # درایور پیامک (Kavenegar / Log)
//! ├── database/       # لایه دیتابیس
//! ├── models/         # مدل‌های داده
//! ├── services/       # منطق کسب‌وکار
//! ├── api/            # لایه API
//! └── utils/          # توابع کمکی
//! ```
//!
//! ## مثال استفاده
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shop_backend::{cache::MemoryDriver, prelude::*, sms::LogDriver};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let db = Database::in_memory().await?;
//!     let state = AppState::new(
//!         db,
//!         Arc::new(MemoryDriver::new()),
//!         Arc::new(LogDriver::new()),
//!         Config::default(),
//!     );
//!     let app = shop_backend::api::create_router(state);
//!     # let _ = app;
//!     Ok(())
//! }
//! ```

// =====================================
// Module Declarations
// =====================================
/// ماژول مدیریت تنظیمات برنامه
pub mod config;

/// ماژول لاگر
pub mod logger;

/// ماژول تعریف و مدیریت خطاها
pub mod error;

/// ماژول درایور کش و قفل توزیع‌شده
pub mod cache;

/// ماژول ارسال پیامک
pub mod sms;

/// ماژول ارتباط با دیتابیس
pub mod database;

/// ماژول مدل‌های داده (Domain Models)
pub mod models;

/// ماژول سرویس‌ها (Business Logic)
pub mod services;

/// ماژول API و HTTP Handlers
pub mod api;

/// ماژول توابع کمکی
pub mod utils;

// =====================================
// Re-exports
// =====================================
/// نتیجه عملیات با خطای سفارشی ما
pub use error::Result;

/// خطای اصلی برنامه
pub use error::AppError;

// =====================================
// Prelude Module
// =====================================
/// ماژول prelude برای import راحت‌تر آیتم‌های پرکاربرد
///
/// ```rust
/// use shop_backend::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cache::{CacheDriver, CacheDriverExt};
    pub use crate::config::Config;
    pub use crate::database::Database;
    pub use crate::error::{AppError, Result};
    pub use crate::logger::Logger;
    pub use crate::models::*;
    pub use crate::services::*;
    pub use crate::sms::SmsDriver;
}
