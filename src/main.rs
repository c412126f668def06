use ambassador_coupons::{
    config::{self, database},
    core::{cache::UsageStatsCache, clock::SystemClock, stats::UsageStats},
    errors::Result,
    web::{AppState, build_router},
};
use chrono::Duration;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!("Successfully processed application configuration.");

    // 4. Connect and make sure the schema exists
    let database_url = app_config.database_url();
    if database_url == database::DEFAULT_DATABASE_URL {
        std::fs::create_dir_all("data")?;
    }
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Statistics service with a bounded cache
    let reporting = &app_config.reporting;
    let ttl_secs = i64::try_from(reporting.cache_ttl_secs).unwrap_or(i64::MAX);
    let cache = Arc::new(UsageStatsCache::new(
        Duration::try_seconds(ttl_secs).unwrap_or(Duration::MAX),
        reporting.cache_max_entries,
    ));
    let stats = UsageStats::new(db, Arc::new(SystemClock), cache);

    // 6. Serve the portal
    let app = build_router(AppState::new(stats, reporting.default_window_months));
    let listener = tokio::net::TcpListener::bind(&app_config.server.listen_addr)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", app_config.server.listen_addr, e))?;
    info!(addr = %app_config.server.listen_addr, "Ambassador portal listening");
    axum::serve(listener, app).await?;

    Ok(())
}
