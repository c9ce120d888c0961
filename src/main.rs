//! # Shop Backend - نقطه ورود برنامه
//!
//! ترتیب راه‌اندازی:
//! 1. `.env` و تنظیمات
//! 2. لاگر (tracing)
//! 3. دیتابیس و migration‌ها
//! 4. درایور کش و درایور پیامک
//! 5. Router و سرور با graceful shutdown

use tokio::net::TcpListener;
use tracing::info;

use shop_backend::{
    api::{create_router, install_panic_hook},
    cache,
    config::Config,
    database::Database,
    error::Result,
    logger::LoggerBuilder,
    services::AppState,
    sms,
};

/// نقطه ورود اصلی برنامه
///
/// # Errors
/// خطا برمیگردونه اگه:
/// - تنظیمات معتبر نباشن
/// - دیتابیس متصل نشه یا migration شکست بخوره
/// - درایور کش یا پیامک ساخته نشه
/// - سرور استارت نشه
#[tokio::main]
async fn main() -> Result<()> {
    // اگه فایل .env نباشه اوکیه
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    let logger = LoggerBuilder::from_config(&config.log)
        .field("service", env!("CARGO_PKG_NAME"))
        .build()?;
    install_panic_hook();

    logger
        .with_field("environment", format!("{:?}", config.environment))
        .info("Starting shop backend");

    let database = Database::connect(&config.database_url).await?;
    database.migrate().await?;
    info!("Database migrations applied");

    let cache = cache::connect(&config.cache)?;
    if let Err(e) = cache.ping().await {
        logger
            .with_error(&e)
            .warn("Cache is not reachable yet, continuing");
    }

    let sms = sms::connect(&config.sms)?;

    let addr = config.server_addr();
    let state = AppState::new(database, cache, sms, config);
    let app = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    logger
        .with_field("addr", &addr)
        .info("Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    logger.info("Server stopped");
    Ok(())
}

/// صبر تا Ctrl+C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
