//! Monthly usage statistics for ambassadors.
//!
//! For an ambassador and a trailing window of N months this computes, per
//! calendar month, how often the ambassador's discount codes were used and how
//! many of those uses became validated orders. Months without usage are left
//! out rather than reported as zeros.
//!
//! Statistics are advisory: if the query fails the caller gets an empty list and
//! the failure is logged. Results are cached briefly (see [`UsageStatsCache`]);
//! recording or updating usage through [`UsageStats`] invalidates the affected
//! ambassador's entries.

use crate::{
    core::{
        ambassador::{self, AmbassadorUpdate, get_code_owners, owned_code_ids_query},
        cache::{StatsKey, UsageStatsCache},
        clock::Clock,
        usage::{self, NewUsage},
    },
    entities::{UsageRecord, UsageState, partner, usage_record},
    errors::Result,
};
use chrono::{Months, NaiveDate};
use sea_orm::{
    FromQueryResult, QueryOrder, QuerySelect,
    prelude::*,
    sea_query::{Expr, SimpleExpr},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Order states counted as validated orders. Fixed, not configurable.
pub const VALIDATED_STATES: [&str; 2] = ["sale", "done"];

/// Window used when the caller does not pick one.
pub const DEFAULT_WINDOW_MONTHS: u32 = 12;

const MONTH_EXPR: &str = "substr(usage_date, 1, 7)";

/// Usage of an ambassador's codes during one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromQueryResult)]
pub struct MonthlyUsage {
    /// Month as `YYYY-MM`
    pub month: String,
    /// Number of usage records in the month
    pub total_usage: i64,
    /// Number of those records whose order was validated
    pub validated_orders: i64,
}

/// First day included in a trailing window of `months` ending `today`.
///
/// Same day of month `months` months earlier, clamped to the end of shorter months.
#[must_use]
pub fn window_start(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

fn validated_orders_expr() -> SimpleExpr {
    let states = VALIDATED_STATES
        .iter()
        .map(|state| format!("'{state}'"))
        .collect::<Vec<_>>()
        .join(", ");
    Expr::cust(format!(
        "SUM(CASE WHEN state IN ({states}) THEN 1 ELSE 0 END)"
    ))
}

/// Runs the aggregation query.
///
/// Counts usage records of the codes owned by `ambassador_id` (optionally only
/// `code_id`) dated on or after `since`, grouped by month, newest month first.
pub async fn query_monthly_usage<C>(
    db: &C,
    ambassador_id: i64,
    code_id: Option<i64>,
    since: NaiveDate,
) -> std::result::Result<Vec<MonthlyUsage>, DbErr>
where
    C: ConnectionTrait,
{
    let mut query = UsageRecord::find()
        .select_only()
        .column_as(Expr::cust(MONTH_EXPR), "month")
        .column_as(Expr::cust("COUNT(*)"), "total_usage")
        .column_as(validated_orders_expr(), "validated_orders")
        .filter(usage_record::Column::DiscountCodeId.in_subquery(owned_code_ids_query(ambassador_id)))
        .filter(usage_record::Column::UsageDate.gte(since));

    if let Some(code_id) = code_id {
        query = query.filter(usage_record::Column::DiscountCodeId.eq(code_id));
    }

    query
        .group_by(Expr::cust(MONTH_EXPR))
        .order_by_desc(Expr::cust(MONTH_EXPR))
        .into_model::<MonthlyUsage>()
        .all(db)
        .await
}

/// Usage statistics service: aggregation, caching and cache-invalidating writes.
#[derive(Debug, Clone)]
pub struct UsageStats {
    db: DatabaseConnection,
    clock: Arc<dyn Clock>,
    cache: Arc<UsageStatsCache>,
}

impl UsageStats {
    /// Creates the service around an existing connection, clock and cache.
    #[must_use]
    pub fn new(db: DatabaseConnection, clock: Arc<dyn Clock>, cache: Arc<UsageStatsCache>) -> Self {
        Self { db, clock, cache }
    }

    /// The underlying database connection.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The clock used for windows and cache expiry.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// The shared result cache.
    #[must_use]
    pub fn cache(&self) -> &UsageStatsCache {
        &self.cache
    }

    /// Monthly statistics over all codes owned by `ambassador_id`.
    ///
    /// Never fails: store errors are logged and produce an empty list.
    pub async fn get_usage_stats(&self, ambassador_id: i64, months: u32) -> Vec<MonthlyUsage> {
        self.cached_stats(StatsKey {
            ambassador_id,
            code_id: None,
            months,
        })
        .await
    }

    /// Monthly statistics for one code owned by `ambassador_id`.
    ///
    /// Empty when the code is not in the ambassador's owned set.
    pub async fn get_code_usage_stats(
        &self,
        ambassador_id: i64,
        code_id: i64,
        months: u32,
    ) -> Vec<MonthlyUsage> {
        self.cached_stats(StatsKey {
            ambassador_id,
            code_id: Some(code_id),
            months,
        })
        .await
    }

    async fn cached_stats(&self, key: StatsKey) -> Vec<MonthlyUsage> {
        let now = self.clock.now();
        if let Some(stats) = self.cache.get(&key, now).await {
            debug!(?key, "Usage stats cache hit");
            return stats;
        }

        let generation = self.cache.generation(key.ambassador_id).await;
        let since = window_start(now.date_naive(), key.months);
        match query_monthly_usage(&self.db, key.ambassador_id, key.code_id, since).await {
            Ok(stats) => {
                debug!(?key, months_found = stats.len(), "Usage stats computed");
                self.cache.insert(key, stats.clone(), now, generation).await;
                stats
            }
            Err(e) => {
                error!(
                    ambassador_id = key.ambassador_id,
                    code_id = ?key.code_id,
                    months = key.months,
                    error = %e,
                    "Usage aggregation failed, returning empty statistics"
                );
                Vec::new()
            }
        }
    }

    /// Drops cached statistics of `ambassador_id`.
    pub async fn invalidate_ambassador(&self, ambassador_id: i64) {
        self.cache.invalidate_ambassador(ambassador_id).await;
    }

    /// Applies an ambassador update (see [`ambassador::update_ambassador`]) and
    /// invalidates the partner's cached statistics, since its owned-code set may
    /// have changed.
    pub async fn update_ambassador(
        &self,
        partner_id: i64,
        update: AmbassadorUpdate,
    ) -> Result<partner::Model> {
        let partner = ambassador::update_ambassador(&self.db, partner_id, update).await?;
        self.invalidate_ambassador(partner_id).await;
        Ok(partner)
    }

    /// Records a redemption, dated today by default, and invalidates the cached
    /// statistics it affects.
    pub async fn record_usage(&self, usage: NewUsage) -> Result<usage_record::Model> {
        let record = usage::create_usage_record(&self.db, usage, self.clock.now()).await?;
        self.invalidate_for_record(&record).await;
        Ok(record)
    }

    /// Moves a usage record to `state` and invalidates the cached statistics it affects.
    pub async fn update_usage_state(
        &self,
        record_id: i64,
        state: UsageState,
    ) -> Result<usage_record::Model> {
        let record = usage::transition_usage_state(&self.db, record_id, state).await?;
        self.invalidate_for_record(&record).await;
        Ok(record)
    }

    /// Invalidates the recording partner and every ambassador owning the record's code.
    async fn invalidate_for_record(&self, record: &usage_record::Model) {
        self.invalidate_ambassador(record.partner_id).await;
        match get_code_owners(&self.db, record.discount_code_id).await {
            Ok(owners) => {
                for owner in owners {
                    self.invalidate_ambassador(owner).await;
                }
            }
            Err(e) => {
                warn!(
                    code_id = record.discount_code_id,
                    error = %e,
                    "Could not resolve code owners, clearing usage stats cache"
                );
                self.cache.clear().await;
            }
        }
    }
}
