use crate::{
    core::{
        export::{CSV_CONTENT_DISPOSITION, CSV_CONTENT_TYPE, render_csv},
        report::{self, CodeStats},
    },
    web::{AppState, HOME_PATH, LOGIN_PATH, PORTAL_PATH, auth, views},
};
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// Largest window a request may ask for.
pub const MAX_WINDOW_MONTHS: u32 = 120;

const ACCESS_DENIED: &str = "Access denied";

/// Query parameters shared by the report routes.
#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    /// Trailing window in months
    pub months: Option<u32>,
}

impl ReportParams {
    /// Requested window, the default when absent, `None` when out of range.
    #[must_use]
    pub fn window(&self, default: u32) -> Option<u32> {
        match self.months {
            None => Some(default),
            Some(months) if (1..=MAX_WINDOW_MONTHS).contains(&months) => Some(months),
            Some(_) => None,
        }
    }
}

/// Window of a report request. Unparseable parameters are treated like an
/// out-of-range window and yield `None`.
fn report_window(
    params: Result<Query<ReportParams>, QueryRejection>,
    default: u32,
) -> Option<u32> {
    match params {
        Ok(Query(params)) => params.window(default),
        Err(rejection) => {
            debug!(error = %rejection, "Malformed report query");
            None
        }
    }
}

fn error_page(status: StatusCode, message: &str) -> Response {
    (status, Html(views::error_page(message))).into_response()
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Report keyed by discount code id, the shape of the JSON endpoint.
fn report_by_code(report: Vec<CodeStats>) -> BTreeMap<i64, CodeStats> {
    report.into_iter().map(|code| (code.code_id, code)).collect()
}

/// `GET /my/ambassador/coupons`: the portal page.
pub async fn ambassador_coupons(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<ReportParams>, QueryRejection>,
) -> Response {
    let partner = match auth::current_partner(state.db(), &headers).await {
        Ok(Some(partner)) => partner,
        Ok(None) => return Redirect::to(LOGIN_PATH).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to resolve partner for portal page");
            return error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Your coupon statistics could not be loaded.",
            );
        }
    };

    if !partner.is_ambassador {
        return Redirect::to(HOME_PATH).into_response();
    }

    let Some(months) = report_window(params, state.default_window_months) else {
        return error_page(StatusCode::BAD_REQUEST, "Invalid reporting period.");
    };

    match report::build_ambassador_report(&state.stats, partner.id, months).await {
        Ok(report) => Html(views::portal_page(&partner, &report, months)).into_response(),
        Err(e) => {
            error!(partner_id = partner.id, error = %e, "Failed to build ambassador report");
            error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Your coupon statistics could not be loaded.",
            )
        }
    }
}

/// `GET /my/ambassador/coupons/json`: statistics per code as JSON.
pub async fn ambassador_coupons_json(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<ReportParams>, QueryRejection>,
) -> Response {
    let partner = match auth::current_partner(state.db(), &headers).await {
        Ok(Some(partner)) if partner.is_ambassador => partner,
        Ok(_) => return json_error(StatusCode::FORBIDDEN, ACCESS_DENIED),
        Err(e) => {
            error!(error = %e, "Failed to resolve partner for JSON report");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error");
        }
    };

    let Some(months) = report_window(params, state.default_window_months) else {
        return json_error(StatusCode::BAD_REQUEST, "Invalid reporting period");
    };

    match report::build_ambassador_report(&state.stats, partner.id, months).await {
        Ok(report) => Json(report_by_code(report)).into_response(),
        Err(e) => {
            error!(partner_id = partner.id, error = %e, "Failed to build ambassador report");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Coupon statistics are unavailable",
            )
        }
    }
}

/// `GET /my/ambassador/coupons/export`: statistics per (code, month) as CSV.
pub async fn ambassador_coupons_export(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<ReportParams>, QueryRejection>,
) -> Response {
    let partner = match auth::current_partner(state.db(), &headers).await {
        Ok(Some(partner)) if partner.is_ambassador => partner,
        Ok(_) => return Redirect::to(HOME_PATH).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to resolve partner for CSV export");
            return Redirect::to(PORTAL_PATH).into_response();
        }
    };

    let Some(months) = report_window(params, state.default_window_months) else {
        return Redirect::to(PORTAL_PATH).into_response();
    };

    match report::build_ambassador_report(&state.stats, partner.id, months).await {
        Ok(report) => {
            info!(partner_id = partner.id, codes = report.len(), "Exporting coupon statistics");
            (
                [
                    (header::CONTENT_TYPE, CSV_CONTENT_TYPE),
                    (header::CONTENT_DISPOSITION, CSV_CONTENT_DISPOSITION),
                ],
                render_csv(&report),
            )
                .into_response()
        }
        Err(e) => {
            error!(partner_id = partner.id, error = %e, "CSV export failed");
            Redirect::to(PORTAL_PATH).into_response()
        }
    }
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}
