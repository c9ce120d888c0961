//! # ماژول لاگر (Structured Logger)
//!
//! یه wrapper نازک دور `tracing` و `tracing-subscriber`.
//!
//! ## دو بخش داره:
//! - [`LoggerBuilder`]: ساخت و نصب subscriber سراسری (سطح، فرمت، خروجی‌ها)
//! - [`Logger`]: handle سبک با فیلدهای context که میشه ازش child ساخت
//!
//! ## مفاهیم Rust:
//! - **Builder Pattern**: تنظیم تدریجی و `build()` در انتها
//! - **MakeWriter**: trait ساخت writer در tracing-subscriber
//! - **Fan-out**: با `MakeWriterExt::and` هر رکورد به چند خروجی میره
//! - **Arc**: اشتراک فیلدها بین clone‌ها بدون کپی
//!
//! ## مثال
//! ```rust,no_run
//! use shop_backend::logger::{LogFormat, LoggerBuilder};
//!
//! let logger = LoggerBuilder::new()
//!     .level("debug")
//!     .format(LogFormat::Json)
//!     .stdout()
//!     .file("logs/app.log")
//!     .build()
//!     .expect("logger");
//!
//! let order_log = logger.with_field("order_id", 42);
//! order_log.info("order paid");
//! ```

use std::{
    fmt::Display,
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt::{
        self,
        writer::{BoxMakeWriter, MakeWriterExt},
    },
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LogConfig;

// =====================================
// Log Format
// =====================================
/// فرمت خروجی لاگ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// چندخطی و خوانا، مناسب development
    #[default]
    Pretty,

    /// یک خط JSON برای هر رکورد، مناسب جمع‌آوری لاگ
    Json,

    /// یک خط ساده
    Compact,
}

impl From<String> for LogFormat {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" | "plain" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// مقصد لاگ‌ها
#[derive(Debug, Clone, PartialEq, Eq)]
enum Sink {
    Stdout,
    Stderr,
    File(PathBuf),
}

// =====================================
// Logger Builder
// =====================================
/// ساخت و نصب subscriber سراسری
///
/// اگه هیچ خروجی‌ای مشخص نشه، stdout استفاده میشه.
/// `RUST_LOG` در صورت وجود بر `level` اولویت داره.
#[derive(Debug, Clone)]
pub struct LoggerBuilder {
    level: String,
    format: LogFormat,
    sinks: Vec<Sink>,
    fields: Vec<(String, String)>,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerBuilder {
    /// ساخت builder با سطح `info` و فرمت Pretty
    #[must_use]
    pub fn new() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            sinks: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// ساخت builder از تنظیمات برنامه
    #[must_use]
    pub fn from_config(config: &LogConfig) -> Self {
        let mut builder = Self::new()
            .level(config.level.clone())
            .format(config.format)
            .stdout();

        if let Some(path) = &config.file {
            builder = builder.file(path.clone());
        }

        builder
    }

    /// سطح یا فیلتر (مثلا `info` یا `shop_backend=debug,tower_http=info`)
    #[must_use]
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    #[must_use]
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// اضافه کردن stdout به خروجی‌ها
    #[must_use]
    pub fn stdout(mut self) -> Self {
        self.push_sink(Sink::Stdout);
        self
    }

    /// اضافه کردن stderr به خروجی‌ها
    #[must_use]
    pub fn stderr(mut self) -> Self {
        self.push_sink(Sink::Stderr);
        self
    }

    /// اضافه کردن فایل به خروجی‌ها (append)
    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.push_sink(Sink::File(path.into()));
        self
    }

    /// فیلد ثابت روی Logger برگشتی (مثلا نام سرویس)
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    fn push_sink(&mut self, sink: Sink) {
        if !self.sinks.contains(&sink) {
            self.sinks.push(sink);
        }
    }

    /// ترکیب همه‌ی خروجی‌ها در یک MakeWriter
    ///
    /// # Errors
    /// خطا برمیگردونه اگه فایل لاگ باز نشه
    fn make_writer(&self) -> std::io::Result<BoxMakeWriter> {
        let sinks = if self.sinks.is_empty() {
            vec![Sink::Stdout]
        } else {
            self.sinks.clone()
        };

        let mut combined: Option<BoxMakeWriter> = None;

        for sink in sinks {
            let writer = match sink {
                Sink::Stdout => BoxMakeWriter::new(std::io::stdout),
                Sink::Stderr => BoxMakeWriter::new(std::io::stderr),
                Sink::File(path) => {
                    if let Some(parent) = path.parent() {
                        if !parent.as_os_str().is_empty() {
                            fs::create_dir_all(parent)?;
                        }
                    }
                    let file = OpenOptions::new().create(true).append(true).open(&path)?;
                    BoxMakeWriter::new(Arc::new(file))
                }
            };

            combined = Some(match combined {
                Some(previous) => BoxMakeWriter::new(previous.and(writer)),
                None => writer,
            });
        }

        Ok(combined.unwrap_or_else(|| BoxMakeWriter::new(std::io::stdout)))
    }

    /// آیا رنگ ANSI فعال باشه؟ فقط وقتی همه‌ی خروجی‌ها ترمینال باشن
    fn ansi(&self) -> bool {
        self.format != LogFormat::Json
            && self.sinks.iter().all(|s| !matches!(s, Sink::File(_)))
    }

    /// نصب subscriber سراسری و برگردوندن Logger ریشه
    ///
    /// اگه قبلا subscriber نصب شده باشه (مثلا در تست‌ها) خطا نمیده
    /// و فقط Logger رو برمیگردونه.
    ///
    /// # Errors
    /// خطا برمیگردونه اگه فایل لاگ باز نشه
    pub fn build(self) -> std::io::Result<Logger> {
        let writer = self.make_writer()?;
        let ansi = self.ansi();

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.level));

        let registry = tracing_subscriber::registry().with(filter);

        let installed = match self.format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_target(true)
                        .with_writer(writer),
                )
                .try_init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true)
                        .with_ansi(ansi)
                        .with_writer(writer),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(true)
                        .with_ansi(ansi)
                        .with_writer(writer),
                )
                .try_init(),
        };

        if installed.is_err() {
            tracing::debug!("global subscriber already installed, reusing it");
        }

        Ok(Logger::new().with_fields(self.fields))
    }
}

// =====================================
// Logger Handle
// =====================================
/// Logger با فیلدهای context
///
/// # مفاهیم:
/// - `Arc<Vec<..>>`: clone فقط شمارنده رو زیاد میکنه
/// - child logger: `with_field` یه Logger جدید میسازه و والد دست نمیخوره
///
/// ```rust
/// use shop_backend::logger::Logger;
///
/// let root = Logger::new().with_field("service", "shop");
/// let child = root.with_field("user_id", "u1");
///
/// assert_eq!(root.fields().len(), 1);
/// assert_eq!(child.render_fields(), "service=shop user_id=u1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Logger {
    fields: Arc<Vec<(String, String)>>,
}

/// کلیدهایی که هر کدوم فیلد جدا در رکورد tracing میشن
///
/// بقیه‌ی فیلدها رندر میشن و در فیلد `context` میرن.
pub const STRUCTURED_KEYS: [&str; 8] = [
    "service",
    "request_id",
    "method",
    "path",
    "status",
    "user_id",
    "error",
    "reason",
];

/// فیلدهای یک رکورد: کلیدهای شناخته‌شده جدا، بقیه رندر شده
#[derive(Debug, PartialEq, Eq)]
struct EventFields<'a> {
    known: [Option<&'a str>; STRUCTURED_KEYS.len()],
    context: String,
}

/// ارسال رویداد tracing با فیلدهای ساختاریافته
macro_rules! emit {
    ($level:ident, $logger:expr, $message:expr) => {{
        let event = $logger.event_fields();
        let [service, request_id, method, path, status, user_id, error, reason] = event.known;
        let context = (!event.context.is_empty()).then_some(event.context.as_str());
        tracing::$level!(
            service,
            request_id,
            method,
            path,
            status,
            user_id,
            error,
            reason,
            context,
            "{}",
            $message
        );
    }};
}

impl Logger {
    /// Logger خالی بدون فیلد
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ساخت child با یک فیلد اضافه
    ///
    /// اگه کلید قبلا وجود داشته باشه، مقدارش در child جایگزین میشه.
    #[must_use]
    pub fn with_field(&self, key: impl Into<String>, value: impl Display) -> Self {
        self.with_fields([(key.into(), value.to_string())])
    }

    /// ساخت child با چند فیلد
    #[must_use]
    pub fn with_fields<I, K, V>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Display,
    {
        let mut merged: Vec<(String, String)> = self.fields.as_ref().clone();

        for (key, value) in fields {
            let key = key.into();
            let value = value.to_string();
            match merged.iter_mut().find(|(k, _)| *k == key) {
                Some(existing) => existing.1 = value,
                None => merged.push((key, value)),
            }
        }

        Self {
            fields: Arc::new(merged),
        }
    }

    /// child با فیلد `error` و زنجیره‌ی `source`‌ها
    #[must_use]
    pub fn with_error(&self, err: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push_str(": ");
            chain.push_str(&cause.to_string());
            source = cause.source();
        }

        self.with_field("error", chain)
    }

    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// رندر فیلدها به صورت `key=value`
    ///
    /// مقدارهایی که فاصله یا `=` دارن داخل کوتیشن میرن.
    #[must_use]
    pub fn render_fields(&self) -> String {
        render(self.fields.iter())
    }

    fn event_fields(&self) -> EventFields<'_> {
        let mut known = [None; STRUCTURED_KEYS.len()];
        let mut rest = Vec::new();

        for field in self.fields.iter() {
            match STRUCTURED_KEYS.iter().position(|k| *k == field.0) {
                Some(i) => known[i] = Some(field.1.as_str()),
                None => rest.push(field),
            }
        }

        EventFields {
            known,
            context: render(rest.into_iter()),
        }
    }

    pub fn debug(&self, message: impl Display) {
        emit!(debug, self, message);
    }

    pub fn info(&self, message: impl Display) {
        emit!(info, self, message);
    }

    pub fn warn(&self, message: impl Display) {
        emit!(warn, self, message);
    }

    pub fn error(&self, message: impl Display) {
        emit!(error, self, message);
    }
}

fn render<'a>(fields: impl Iterator<Item = &'a (String, String)>) -> String {
    fields
        .map(|(key, value)| {
            if value.is_empty() || value.contains(char::is_whitespace) || value.contains('=') {
                format!("{key}={value:?}")
            } else {
                format!("{key}={value}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_does_not_touch_parent() {
        let root = Logger::new().with_field("service", "shop");
        let child = root.with_field("request_id", "abc");

        assert_eq!(root.fields().len(), 1);
        assert_eq!(child.fields().len(), 2);
    }

    #[test]
    fn test_field_override() {
        let logger = Logger::new()
            .with_field("status", 200)
            .with_field("status", 404);

        assert_eq!(logger.render_fields(), "status=404");
    }

    #[test]
    fn test_render_quotes_spaces() {
        let logger = Logger::new()
            .with_field("message", "not found")
            .with_field("empty", "");

        assert_eq!(logger.render_fields(), r#"message="not found" empty="""#);
    }

    #[test]
    fn test_with_error_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let logger = Logger::new().with_error(&io);

        assert_eq!(logger.render_fields(), r#"error="disk full""#);
    }

    #[test]
    fn test_event_fields_split_known_keys() {
        let logger = Logger::new()
            .with_field("request_id", "r-1")
            .with_field("status", 404)
            .with_field("message", "not found")
            .with_field("phone", "0912***4567");

        let event = logger.event_fields();
        assert_eq!(event.known[1], Some("r-1"));
        assert_eq!(event.known[4], Some("404"));
        assert_eq!(event.known[0], None);
        assert_eq!(event.context, r#"message="not found" phone=0912***4567"#);
    }

    /// writer که خروجی رو در حافظه جمع میکنه
    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_json_record_has_separate_fields() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(move || writer.clone()));

        tracing::subscriber::with_default(subscriber, || {
            Logger::new()
                .with_field("request_id", "r-7")
                .with_field("status", 500)
                .with_field("method", "GET")
                .with_field("attempt", 2)
                .with_field("reason", "db down")
                .error("request failed");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let line: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        let fields = &line["fields"];

        assert_eq!(fields["message"], "request failed");
        assert_eq!(fields["request_id"], "r-7");
        assert_eq!(fields["status"], "500");
        assert_eq!(fields["method"], "GET");
        assert_eq!(fields["reason"], "db down");
        assert_eq!(fields["context"], "attempt=2");
        assert!(fields.get("user_id").is_none());
    }

    #[test]
    fn test_log_format_from_string() {
        assert_eq!(LogFormat::from("JSON".to_string()), LogFormat::Json);
        assert_eq!(LogFormat::from("compact".to_string()), LogFormat::Compact);
        assert_eq!(LogFormat::from("whatever".to_string()), LogFormat::Pretty);
    }

    #[test]
    fn test_builder_dedups_sinks() {
        let builder = LoggerBuilder::new().stdout().stdout().stderr();
        assert_eq!(builder.sinks, vec![Sink::Stdout, Sink::Stderr]);
        assert!(builder.ansi());
    }

    #[test]
    fn test_builder_file_sink_disables_ansi() {
        let builder = LoggerBuilder::new().stdout().file("target/test-logs/app.log");
        assert!(!builder.ansi());
    }

    #[test]
    fn test_build_is_idempotent() {
        let dir = std::env::temp_dir().join(format!("shop-logger-{}", nanoid::nanoid!(8)));
        let path = dir.join("app.log");

        let first = LoggerBuilder::new()
            .format(LogFormat::Compact)
            .file(&path)
            .field("service", "shop")
            .build()
            .expect("first build");
        let second = LoggerBuilder::new().build().expect("second build");

        first.info("hello");
        second.info("again");

        assert!(path.exists());
        assert_eq!(first.render_fields(), "service=shop");
        let _ = std::fs::remove_dir_all(dir);
    }
}
