//! درایور پیامک برای توسعه: هیچ چیزی ارسال نمیشه.

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;

use super::{otp_message, SmsDriver, SmsResult};
use crate::utils::mask_phone;

/// پیامکی که LogDriver دریافت کرده
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentSms {
    pub receptor: String,
    pub message: String,

    /// کد، اگه پیام از نوع OTP بوده
    pub code: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// حداکثر پیام‌هایی که outbox نگه میداره؛ قدیمی‌ترها دور ریخته میشن
pub const OUTBOX_CAPACITY: usize = 1000;

/// درایوری که پیام‌ها رو لاگ میکنه و در outbox نگه میداره
#[derive(Debug, Default)]
pub struct LogDriver {
    outbox: RwLock<VecDeque<SentSms>>,
}

impl LogDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// همه‌ی پیام‌های ارسال‌شده به ترتیب
    pub async fn sent(&self) -> Vec<SentSms> {
        self.outbox.read().await.iter().cloned().collect()
    }

    /// آخرین پیام ارسال‌شده به یک شماره
    pub async fn last_to(&self, receptor: &str) -> Option<SentSms> {
        self.outbox
            .read()
            .await
            .iter()
            .rev()
            .find(|sms| sms.receptor == receptor)
            .cloned()
    }

    async fn push(&self, receptor: &str, message: String, code: Option<String>) {
        info!(receptor = %mask_phone(receptor), message = %message, "SMS (log driver)");

        let mut outbox = self.outbox.write().await;
        if outbox.len() >= OUTBOX_CAPACITY {
            outbox.pop_front();
        }
        outbox.push_back(SentSms {
            receptor: receptor.to_string(),
            message,
            code,
            sent_at: Utc::now(),
        });
    }
}

#[async_trait]
impl SmsDriver for LogDriver {
    async fn send(&self, receptor: &str, message: &str) -> SmsResult<()> {
        self.push(receptor, message.to_string(), None).await;
        Ok(())
    }

    async fn send_otp(&self, receptor: &str, code: &str) -> SmsResult<()> {
        self.push(receptor, otp_message(code), Some(code.to_string()))
            .await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
