//! # درایور کاوه‌نگار
//!
//! - پیامک معمولی: `POST {base}/v1/{api_key}/sms/send.json`
//! - کد ورود با قالب: `POST {base}/v1/{api_key}/verify/lookup.json`
//!
//! پاسخ همیشه به شکل `{"return": {"status", "message"}, "entries": [...]}` هست؛
//! هر `status` غیر از 200 خطای provider حساب میشه، حتی وقتی HTTP status موفق باشه.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{SmsDriver, SmsError, SmsResult};
use crate::{config::SmsConfig, utils::mask_phone};

const STATUS_OK: i64 = 200;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "return")]
    result: ApiReturn,
}

#[derive(Debug, Deserialize)]
struct ApiReturn {
    status: i64,
    #[serde(default)]
    message: String,
}

/// درایور HTTP کاوه‌نگار
#[derive(Debug, Clone)]
pub struct KavenegarDriver {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    sender: String,
    otp_template: Option<String>,
}

impl KavenegarDriver {
    /// # Errors
    /// - `SmsError::Config` اگه کلید API خالی باشه
    /// - `SmsError::Http` اگه client ساخته نشه
    pub fn from_config(config: &SmsConfig) -> SmsResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(SmsError::Config("kavenegar api key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            sender: config.sender.clone(),
            otp_template: config.otp_template.clone().filter(|t| !t.is_empty()),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}/{}", self.base_url, self.api_key, path)
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) -> SmsResult<()> {
        let response = self.client.post(self.endpoint(path)).form(form).send().await?;
        let http_status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<ApiResponse>(&body) {
            Ok(parsed) if parsed.result.status == STATUS_OK => Ok(()),
            Ok(parsed) => {
                warn!(path, status = parsed.result.status, "Kavenegar rejected request");
                Err(SmsError::Provider {
                    status: parsed.result.status,
                    message: parsed.result.message,
                })
            }
            Err(_) => {
                warn!(path, status = %http_status, "Unexpected Kavenegar response");
                Err(SmsError::Provider {
                    status: i64::from(http_status.as_u16()),
                    message: crate::utils::truncate(&body, Some(200)),
                })
            }
        }
    }
}

#[async_trait]
impl SmsDriver for KavenegarDriver {
    async fn send(&self, receptor: &str, message: &str) -> SmsResult<()> {
        if receptor.trim().is_empty() {
            return Err(SmsError::InvalidReceptor(receptor.to_string()));
        }

        debug!(receptor = %mask_phone(receptor), "Sending SMS");
        self.post(
            "sms/send.json",
            &[
                ("receptor", receptor),
                ("sender", self.sender.as_str()),
                ("message", message),
            ],
        )
        .await
    }

    async fn send_otp(&self, receptor: &str, code: &str) -> SmsResult<()> {
        let Some(template) = self.otp_template.as_deref() else {
            return self.send(receptor, &super::otp_message(code)).await;
        };

        if receptor.trim().is_empty() {
            return Err(SmsError::InvalidReceptor(receptor.to_string()));
        }

        debug!(receptor = %mask_phone(receptor), template, "Sending OTP via lookup");
        self.post(
            "verify/lookup.json",
            &[("receptor", receptor), ("token", code), ("template", template)],
        )
        .await
    }

    fn name(&self) -> &'static str {
        "kavenegar"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SmsDriverKind;
    use serde_json::json;
    use wiremock::{
        matchers::{body_string_contains, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn driver(server: &MockServer, template: Option<&str>) -> KavenegarDriver {
        let config = SmsConfig {
            driver: SmsDriverKind::Kavenegar,
            api_key: "test-key".to_string(),
            sender: "10008663".to_string(),
            otp_template: template.map(str::to_string),
            base_url: server.uri(),
            timeout_secs: 5,
        };
        KavenegarDriver::from_config(&config).unwrap()
    }

    fn ok_body() -> serde_json::Value {
        json!({"return": {"status": 200, "message": "تایید شد"}, "entries": []})
    }

    #[tokio::test]
    async fn test_send_plain_sms() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/test-key/sms/send.json"))
            .and(body_string_contains("receptor=09121234567"))
            .and(body_string_contains("sender=10008663"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        driver(&server, None)
            .send("09121234567", "hello")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_otp_uses_lookup_template() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/test-key/verify/lookup.json"))
            .and(body_string_contains("token=482913"))
            .and(body_string_contains("template=shop-login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        driver(&server, Some("shop-login"))
            .send_otp("09121234567", "482913")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_otp_without_template_falls_back_to_send() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/test-key/sms/send.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        driver(&server, None)
            .send_otp("09121234567", "1234")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_provider_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(418).set_body_json(
                json!({"return": {"status": 418, "message": "اعتبار حساب کافی نیست"}, "entries": null}),
            ))
            .mount(&server)
            .await;

        let err = driver(&server, None)
            .send("09121234567", "hello")
            .await
            .unwrap_err();

        assert!(matches!(err, SmsError::Provider { status: 418, .. }));
    }

    #[tokio::test]
    async fn test_non_json_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = driver(&server, None)
            .send("09121234567", "hello")
            .await
            .unwrap_err();

        match err {
            SmsError::Provider { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "bad gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_receptor() {
        let server = MockServer::start().await;
        let err = driver(&server, None).send("  ", "hello").await.unwrap_err();
        assert!(matches!(err, SmsError::InvalidReceptor(_)));
    }
}
