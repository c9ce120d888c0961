//! # مدل کاربر (User Model)
//!
//! Entity و DTO‌های مربوط به کاربر

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// =====================================
// User Entity
// =====================================
/// Entity کاربر
///
/// # مفاهیم:
/// - `FromRow`: تبدیل از ردیف دیتابیس
/// - `Serialize/Deserialize`: برای ذخیره در کش به صورت JSON
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,

    /// شماره موبایل نرمال‌شده (`09xxxxxxxxx`)
    pub phone: String,

    pub name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// کلید کش پروفایل کاربر
    #[must_use]
    pub fn cache_key(id: &str) -> String {
        format!("user:{id}")
    }
}

/// تبدیل User به UserResponse
impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            phone: user.phone,
            name: user.name,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

// =====================================
// Create User DTO
// =====================================
/// داده برای ساخت کاربر (داخلی)
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub id: String,
    pub phone: String,
    pub name: Option<String>,
}

impl CreateUser {
    /// کاربر جدید با شناسه‌ی nanoid
    #[must_use]
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            id: nanoid::nanoid!(21),
            phone: phone.into(),
            name: None,
        }
    }
}

// =====================================
// API Request DTOs
// =====================================
/// درخواست بروزرسانی پروفایل
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100, message = "name must be 2-100 characters"))]
    pub name: Option<String>,
}

// =====================================
// API Response DTOs
// =====================================
/// پاسخ اطلاعات کاربر
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub phone: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
