//! HTTP reporting surface - the ambassador portal page, JSON endpoint and CSV export.
//!
//! Handlers resolve the signed-in partner, check the ambassador flag and only
//! then call into [`crate::core`]. Nothing about a failed aggregation reaches
//! the response body.

/// Identity resolution from request headers
pub mod auth;
/// Route handlers
pub mod routes;
/// HTML rendering
pub mod views;

use crate::core::stats::UsageStats;
use axum::{Router, routing::get};
use sea_orm::DatabaseConnection;

/// Portal page with the ambassador's coupon statistics.
pub const PORTAL_PATH: &str = "/my/ambassador/coupons";
/// JSON version of the portal data.
pub const JSON_PATH: &str = "/my/ambassador/coupons/json";
/// CSV download of the portal data.
pub const EXPORT_PATH: &str = "/my/ambassador/coupons/export";
/// Where unauthenticated visitors are sent.
pub const LOGIN_PATH: &str = "/web/login";
/// Where signed-in partners without ambassador status are sent.
pub const HOME_PATH: &str = "/my";

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Statistics service (owns the connection and the cache)
    pub stats: UsageStats,
    /// Window used when a request has no `months` parameter
    pub default_window_months: u32,
}

impl AppState {
    /// Creates the state shared by all handlers.
    #[must_use]
    pub const fn new(stats: UsageStats, default_window_months: u32) -> Self {
        Self {
            stats,
            default_window_months,
        }
    }

    /// Database connection shortcut.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        self.stats.db()
    }
}

/// Builds the router with all portal routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(PORTAL_PATH, get(routes::ambassador_coupons))
        .route(JSON_PATH, get(routes::ambassador_coupons_json))
        .route(EXPORT_PATH, get(routes::ambassador_coupons_export))
        .route("/health", get(routes::health))
        .with_state(state)
}
