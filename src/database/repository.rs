//! # Repository Pattern
//!
//! یه لایه انتزاعی بین منطق برنامه و دیتابیس.
//!
//! ## مفاهیم Rust:
//! - **async_trait**: امکان async در traits
//! - **Associated Types**: نوع‌های مرتبط با trait

use async_trait::async_trait;
use chrono::Utc;

use super::Database;
use crate::{
    error::{AppError, Result},
    models::{CreateUser, User},
};

// =====================================
// Base Repository Trait
// =====================================
/// Trait پایه برای Repository‌ها
#[async_trait]
pub trait Repository: Send + Sync {
    /// نوع Entity که این repository باهاش کار میکنه
    type Entity: Send + Sync;

    /// نوع شناسه (ID)
    type Id: Send + Sync + ?Sized;

    async fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>>;

    /// حذف با ID؛ `true` اگه ردیفی حذف شد
    async fn delete(&self, id: &Self::Id) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

// =====================================
// User Repository
// =====================================
const USER_COLUMNS: &str = "id, phone, name, is_active, created_at, updated_at";

/// Repository برای مدیریت کاربران
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// پیدا کردن با شماره موبایل نرمال‌شده
    pub async fn find_by_phone(&self, phone: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone = ?"
        ))
        .bind(phone)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(user)
    }

    /// ایجاد کاربر جدید
    pub async fn create(&self, create_user: &CreateUser) -> Result<User> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, phone, name, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&create_user.id)
        .bind(&create_user.phone)
        .bind(&create_user.name)
        .bind(true)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        self.find_by_id(create_user.id.as_str())
            .await?
            .ok_or_else(|| AppError::internal("failed to create user"))
    }

    /// پیدا کردن یا ساختن کاربر با شماره؛ `bool` یعنی تازه ساخته شد
    pub async fn find_or_create(&self, phone: &str) -> Result<(User, bool)> {
        if let Some(user) = self.find_by_phone(phone).await? {
            return Ok((user, false));
        }

        let user = self.create(&CreateUser::new(phone)).await?;
        Ok((user, true))
    }

    /// تغییر نام؛ `None` اگه کاربر نباشه
    pub async fn update_name(&self, id: &str, name: Option<&str>) -> Result<Option<User>> {
        let result = sqlx::query("UPDATE users SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(Utc::now())
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    /// فعال/غیرفعال کردن حساب
    pub async fn set_active(&self, id: &str, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Repository for UserRepository {
    type Entity = User;
    type Id = str;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(user)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count)
    }
}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> UserRepository {
        UserRepository::new(Database::in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_find_or_create_is_idempotent() {
        let repo = repo().await;

        let (first, created) = repo.find_or_create("09121234567").await.unwrap();
        assert!(created);
        assert!(first.is_active);

        let (second, created) = repo.find_or_create("09121234567").await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_name() {
        let repo = repo().await;
        let (user, _) = repo.find_or_create("09120000000").await.unwrap();

        let updated = repo
            .update_name(&user.id, Some("سارا"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("سارا"));
        assert!(updated.updated_at >= user.updated_at);

        assert!(repo.update_name("missing", Some("x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_active_and_delete() {
        let repo = repo().await;
        let (user, _) = repo.find_or_create("09130000000").await.unwrap();

        assert!(repo.set_active(&user.id, false).await.unwrap());
        let reloaded = repo.find_by_id(&user.id).await.unwrap().unwrap();
        assert!(!reloaded.is_active);

        assert!(repo.delete(&user.id).await.unwrap());
        assert!(!repo.delete(&user.id).await.unwrap());
        assert!(repo.find_by_phone("09130000000").await.unwrap().is_none());
    }
}
