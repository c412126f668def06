//! Identity of the requesting partner.
//!
//! Authentication happens upstream: the proxy in front of the portal signs the
//! user in and forwards their partner id in the `x-partner-id` header.

use crate::{core::ambassador, entities::partner, errors::Result};
use axum::http::HeaderMap;
use sea_orm::DatabaseConnection;

/// Header carrying the authenticated partner id.
pub const PARTNER_HEADER: &str = "x-partner-id";

/// Parses the partner id header. Missing or malformed values yield `None`.
#[must_use]
pub fn partner_id_from_headers(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(PARTNER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Loads the signed-in partner.
///
/// `Ok(None)` means the request is unauthenticated: no header, a malformed one,
/// or an id without a partner row.
pub async fn current_partner(
    db: &DatabaseConnection,
    headers: &HeaderMap,
) -> Result<Option<partner::Model>> {
    match partner_id_from_headers(headers) {
        Some(partner_id) => ambassador::get_partner(db, partner_id).await,
        None => Ok(None),
    }
}
