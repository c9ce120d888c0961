//! # HTTP Handlers
//!
//! هر handler فقط ورودی رو extract میکنه و کار رو به سرویس میسپره؛
//! خطاها با `?` به [`AppError`](crate::error::AppError) و از اونجا به پاسخ HTTP تبدیل میشن.

pub mod auth;
pub mod health;
pub mod user;
