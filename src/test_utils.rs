//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        ambassador, cache::UsageStatsCache, clock::FixedClock, discount_code, stats::UsageStats,
    },
    entities,
    errors::Result,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// TTL of the cache built by [`setup_stats`].
pub const TEST_CACHE_TTL_SECS: i64 = 60;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A fixed instant used by tests that do not care about the date: 2024-06-15 12:00 UTC.
#[must_use]
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Creates a regular (non-ambassador) partner.
pub async fn create_test_partner(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::partner::Model> {
    let email = format!("{}@test.com", name.to_lowercase().replace(' ', "."));
    ambassador::create_partner(db, name.to_string(), Some(email), test_now()).await
}

/// Creates a discount code with no owner.
pub async fn create_test_code(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::discount_code::Model> {
    discount_code::create_discount_code(db, name.to_string(), test_now()).await
}

/// Creates a partner and a code, and makes the partner an ambassador owning the code.
pub async fn create_test_ambassador(
    db: &DatabaseConnection,
    name: &str,
    code_name: &str,
) -> Result<(entities::partner::Model, entities::discount_code::Model)> {
    let partner = create_test_partner(db, name).await?;
    let code = create_test_code(db, code_name).await?;
    let partner = ambassador::grant_ambassador(db, partner.id, vec![code.id]).await?;
    Ok((partner, code))
}

/// Sets up a database with one ambassador owning the code `SUMMER10`.
/// Returns (db, ambassador, code).
pub async fn setup_with_ambassador() -> Result<(
    DatabaseConnection,
    entities::partner::Model,
    entities::discount_code::Model,
)> {
    let db = setup_test_db().await?;
    let (partner, code) = create_test_ambassador(&db, "Test Ambassador", "SUMMER10").await?;
    Ok((db, partner, code))
}

/// Sets up a statistics service over [`setup_with_ambassador`], with the clock
/// frozen at noon UTC on the given date.
/// Returns (stats, ambassador, code, clock).
pub async fn setup_stats(
    year: i32,
    month: u32,
    day: u32,
) -> Result<(
    UsageStats,
    entities::partner::Model,
    entities::discount_code::Model,
    Arc<FixedClock>,
)> {
    let (db, partner, code) = setup_with_ambassador().await?;
    let now = Utc
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .unwrap_or_else(test_now);
    let clock = Arc::new(FixedClock::new(now));
    let cache = Arc::new(UsageStatsCache::new(Duration::seconds(TEST_CACHE_TTL_SECS), 64));
    let shared_clock = Arc::clone(&clock);
    let stats = UsageStats::new(db, shared_clock, cache);
    Ok((stats, partner, code, clock))
}
