//! # ماژول پیامک (SMS)
//!
//! ارسال پیامک از پشت یک trait تا سرویس‌ها به provider وابسته نباشن.
//!
//! | درایور | کاربرد |
//! |---|---|
//! | [`KavenegarDriver`] | ارسال واقعی با API کاوه‌نگار |
//! | [`LogDriver`] | توسعه و تست: فقط لاگ میکنه و پیام‌ها رو نگه میداره |

mod kavenegar;
mod log;

pub use kavenegar::KavenegarDriver;
pub use log::{LogDriver, SentSms, OUTBOX_CAPACITY};

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::{SmsConfig, SmsDriverKind};

/// نتیجه‌ی عملیات پیامک
pub type SmsResult<T> = std::result::Result<T, SmsError>;

/// خطاهای ارسال پیامک
#[derive(Debug, Error)]
pub enum SmsError {
    #[error("sms http error: {0}")]
    Http(#[from] reqwest::Error),

    /// provider درخواست رو رد کرد
    #[error("sms provider returned {status}: {message}")]
    Provider { status: i64, message: String },

    #[error("invalid receptor '{0}'")]
    InvalidReceptor(String),

    #[error("sms configuration error: {0}")]
    Config(String),
}

/// متن پیامک کد ورود
#[must_use]
pub fn otp_message(code: &str) -> String {
    format!("کد ورود شما: {code}")
}

/// درایور ارسال پیامک
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsDriver: Send + Sync {
    /// ارسال پیامک متنی
    async fn send(&self, receptor: &str, message: &str) -> SmsResult<()>;

    /// ارسال کد یکبار مصرف
    async fn send_otp(&self, receptor: &str, code: &str) -> SmsResult<()> {
        self.send(receptor, &otp_message(code)).await
    }

    fn name(&self) -> &'static str;
}

/// ساخت درایور بر اساس تنظیمات
///
/// # Errors
/// `SmsError::Config` اگه کلید API خالی باشه یا client ساخته نشه
pub fn connect(config: &SmsConfig) -> SmsResult<Arc<dyn SmsDriver>> {
    let driver: Arc<dyn SmsDriver> = match config.driver {
        SmsDriverKind::Kavenegar => Arc::new(KavenegarDriver::from_config(config)?),
        SmsDriverKind::Log => Arc::new(LogDriver::new()),
    };

    info!(driver = driver.name(), "SMS driver ready");
    Ok(driver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_log_driver() {
        let driver = connect(&SmsConfig::default()).unwrap();
        assert_eq!(driver.name(), "log");
    }

    #[test]
    fn test_connect_kavenegar_requires_key() {
        let config = SmsConfig {
            driver: SmsDriverKind::Kavenegar,
            ..SmsConfig::default()
        };

        assert!(matches!(connect(&config), Err(SmsError::Config(_))));
    }

    #[tokio::test]
    async fn test_mock_driver() {
        let mut mock = MockSmsDriver::new();
        mock.expect_send_otp()
            .withf(|receptor, code| receptor == "09121234567" && code == "1234")
            .times(1)
            .returning(|_, _| Ok(()));

        mock.send_otp("09121234567", "1234").await.unwrap();
    }
}
