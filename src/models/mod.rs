//! # ماژول مدل‌ها (Domain Models)
//!
//! ## مفاهیم Rust:
//! - **FromRow**: تبدیل از ردیف دیتابیس
//! - **Serialize/Deserialize**: تبدیل JSON (هم برای API هم برای کش)
//! - **Validation**: اعتبارسنجی ورودی با `validator`
//!
//! ## تفاوت انواع مدل:
//! - **Entity**: داده‌ای که در دیتابیس ذخیره میشه (`User`)
//! - **DTO**: برای ارسال/دریافت از API (`*Request`, `*Response`)
//! - **Cache Entry**: داده‌ای که فقط در کش زندگی میکنه (`OtpEntry`)

mod auth;
mod dto;
mod user;

pub use auth::*;
pub use dto::*;
pub use user::*;
