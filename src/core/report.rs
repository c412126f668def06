//! Per-code usage reports for the ambassador portal.
//!
//! A report lists every code in the ambassador's owned set with that code's
//! monthly statistics. The HTML page, the JSON endpoint and the CSV export are
//! all rendered from it.

use crate::{
    core::{ambassador, stats::{MonthlyUsage, UsageStats}},
    errors::Result,
};
use serde::Serialize;

/// Statistics of one discount code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeStats {
    /// The code as customers type it
    pub code: String,
    /// Discount code id
    pub code_id: i64,
    /// Monthly usage, newest month first
    pub stats: Vec<MonthlyUsage>,
}

/// Builds the report for `ambassador_id` over a trailing window of `months`.
///
/// Loading the owned codes can fail; the per-code statistics cannot (a failed
/// aggregation shows up as a code without statistics).
pub async fn build_ambassador_report(
    usage_stats: &UsageStats,
    ambassador_id: i64,
    months: u32,
) -> Result<Vec<CodeStats>> {
    let codes = ambassador::get_owned_codes(usage_stats.db(), ambassador_id).await?;

    let mut report = Vec::with_capacity(codes.len());
    for code in codes {
        let stats = usage_stats
            .get_code_usage_stats(ambassador_id, code.id, months)
            .await;
        report.push(CodeStats {
            code: code.name,
            code_id: code.id,
            stats,
        });
    }

    Ok(report)
}
