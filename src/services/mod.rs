//! # ماژول سرویس‌ها (Business Logic Layer)
//!
//! ## لایه‌بندی معماری
//!
//! ```text
//! ┌─────────────────┐
//! │    API Layer    │  <-- HTTP handlers (axum)
//! ├─────────────────┤
//! │  Service Layer  │  <-- Business logic (اینجا!)
//! ├────────┬────────┤
//! │  Repo  │ Cache  │  <-- SQLite / Redis
//! └────────┴────────┘
//! ```
//!
//! ## مفاهیم Rust:
//! - **Dependency Injection**: درایورها به صورت `Arc<dyn Trait>` تزریق میشن
//! - **Arc<T>**: اشتراک امن بین threads

mod auth_service;
mod user_service;

pub use auth_service::*;
pub use user_service::*;

use std::sync::Arc;

use tracing::warn;

use crate::{
    cache::CacheDriver,
    config::Config,
    database::{Database, UserRepository},
    models::HealthResponse,
    sms::SmsDriver,
};

// =====================================
// Application State
// =====================================
/// وضعیت برنامه که بین همه handlers اشتراک‌گذاری میشه
///
/// هر clone فقط شمارنده‌ی `Arc`‌ها رو زیاد میکنه.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub cache: Arc<dyn CacheDriver>,
    pub sms: Arc<dyn SmsDriver>,
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
}

impl AppState {
    /// ساخت AppState و همه‌ی سرویس‌ها
    #[must_use]
    pub fn new(
        db: Database,
        cache: Arc<dyn CacheDriver>,
        sms: Arc<dyn SmsDriver>,
        config: Config,
    ) -> Self {
        let config = Arc::new(config);
        let user_repo = UserRepository::new(db.clone());

        let auth_service = Arc::new(AuthService::new(
            user_repo.clone(),
            Arc::clone(&cache),
            Arc::clone(&sms),
            Arc::clone(&config),
        ));

        let user_service = Arc::new(UserService::new(
            user_repo,
            Arc::clone(&cache),
            Arc::clone(&config),
        ));

        Self {
            config,
            db,
            cache,
            sms,
            auth_service,
            user_service,
        }
    }

    /// بررسی سلامت دیتابیس (`SELECT 1`) و کش (`PING`)
    pub async fn health(&self) -> HealthResponse {
        let database_ok = match self.db.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                false
            }
        };

        let cache_ok = match self.cache.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, driver = self.cache.name(), "Cache health check failed");
                false
            }
        };

        HealthResponse::new(database_ok, cache_ok, self.cache.name())
    }
}

// =====================================
// Service Trait
// =====================================
/// Marker trait برای services؛ همه باید Send + Sync باشن
pub trait Service: Send + Sync {}
