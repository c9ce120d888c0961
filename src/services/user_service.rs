//! # سرویس پروفایل کاربر
//!
//! پروفایل با الگوی read-through از کش خونده میشه (`user:{id}`) و بعد از
//! هر تغییر، کلیدهای کاربر با `delete_by_pattern` پاک میشن.

use std::sync::Arc;

use tracing::{debug, instrument};
use validator::Validate;

use crate::{
    cache::{CacheDriver, CacheDriverExt},
    config::Config,
    database::{Repository, UserRepository},
    error::{AppError, OptionExt, Result},
    models::{UpdateProfileRequest, User, UserResponse},
    utils::clean_whitespace,
};

use super::Service;

/// سرویس پروفایل
#[derive(Clone)]
pub struct UserService {
    repo: UserRepository,
    cache: Arc<dyn CacheDriver>,
    config: Arc<Config>,
}

impl Service for UserService {}

impl UserService {
    #[must_use]
    pub fn new(repo: UserRepository, cache: Arc<dyn CacheDriver>, config: Arc<Config>) -> Self {
        Self {
            repo,
            cache,
            config,
        }
    }

    /// گرفتن پروفایل
    ///
    /// # Errors
    /// - `NotFound` اگه کاربر نباشه
    /// - `Forbidden` برای حساب غیرفعال
    #[instrument(skip(self))]
    pub async fn get_profile(&self, user_id: &str) -> Result<UserResponse> {
        let user = self.load(user_id).await?;

        if !user.is_active {
            return Err(AppError::forbidden("account is deactivated"));
        }

        Ok(user.into())
    }

    /// بروزرسانی نام و ابطال کش کاربر
    ///
    /// # Errors
    /// - `Validation` برای نام نامعتبر
    /// - `NotFound` اگه کاربر نباشه
    #[instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateProfileRequest,
    ) -> Result<UserResponse> {
        let name = request
            .name
            .as_deref()
            .map(clean_whitespace)
            .filter(|n| !n.is_empty());
        UpdateProfileRequest { name: name.clone() }.validate()?;

        let current = self.load(user_id).await?;
        if !current.is_active {
            return Err(AppError::forbidden("account is deactivated"));
        }

        let user = self
            .repo
            .update_name(user_id, name.as_deref())
            .await?
            .ok_or_else(|| AppError::user_not_found(user_id))?;

        let removed = self
            .cache
            .delete_by_pattern(&User::cache_key(user_id))
            .await?;
        debug!(user_id, removed, "Invalidated user cache");

        Ok(user.into())
    }

    /// خوندن کاربر از کش، یا از دیتابیس و پر کردن کش
    async fn load(&self, user_id: &str) -> Result<User> {
        let key = User::cache_key(user_id);

        if let Some(user) = self.cache.get_object::<User>(&key).await? {
            debug!(user_id, "Profile cache hit");
            return Ok(user);
        }

        let user = self
            .repo
            .find_by_id(user_id)
            .await?
            .ok_or_not_found(format!("user '{user_id}' not found"))?;

        self.cache
            .set_value(&key, &user, Some(self.config.cache.user_ttl()))
            .await?;

        Ok(user)
    }
}
