//! Discount code business logic - codes, their owning ambassador and ambassador set.
//!
//! Any change to the owner or the ambassador set re-runs the auto-heal rule in the
//! same transaction, so the owner is always part of the set once the call returns.

use crate::{
    core::guard,
    entities::{DiscountCode, DiscountCodeAmbassador, discount_code, discount_code_ambassador},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Creates a discount code stamped with `now`. Names are trimmed and must be unique.
pub async fn create_discount_code(
    db: &DatabaseConnection,
    name: String,
    now: DateTime<Utc>,
) -> Result<discount_code::Model> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(Error::validation("Discount code cannot be empty"));
    }

    if get_discount_code_by_name(db, &name).await?.is_some() {
        return Err(Error::DuplicateDiscountCode { name });
    }

    let code = discount_code::ActiveModel {
        name: Set(name),
        ambassador_id: Set(None),
        created_at: Set(now),
        ..Default::default()
    };

    let result = code.insert(db).await?;
    info!(code_id = result.id, code = %result.name, "Created discount code");
    Ok(result)
}

/// Finds a discount code by id.
pub async fn get_discount_code<C>(db: &C, code_id: i64) -> Result<Option<discount_code::Model>>
where
    C: ConnectionTrait,
{
    DiscountCode::find_by_id(code_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a discount code by its exact name.
pub async fn get_discount_code_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<discount_code::Model>> {
    DiscountCode::find()
        .filter(discount_code::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Sets or clears the owning ambassador of a code.
///
/// The new owner must be a flagged ambassador; it is added to the code's
/// ambassador set if missing.
pub async fn set_code_owner(
    db: &DatabaseConnection,
    code_id: i64,
    owner_id: Option<i64>,
) -> Result<discount_code::Model> {
    let txn = db.begin().await?;

    let code = get_discount_code(&txn, code_id)
        .await?
        .ok_or(Error::DiscountCodeNotFound { id: code_id })?;

    if let Some(owner_id) = owner_id {
        guard::require_ambassador(&txn, owner_id).await?;
    }

    let mut active: discount_code::ActiveModel = code.into();
    active.ambassador_id = Set(owner_id);
    let code = active.update(&txn).await?;

    guard::heal_code_ambassadors(&txn, code_id).await?;

    txn.commit().await?;
    info!(code_id, ?owner_id, "Discount code owner updated");
    Ok(code)
}

/// Adds an ambassador to the code's ambassador set. Returns the resulting set.
pub async fn add_code_ambassador(
    db: &DatabaseConnection,
    code_id: i64,
    partner_id: i64,
) -> Result<Vec<i64>> {
    let txn = db.begin().await?;

    get_discount_code(&txn, code_id)
        .await?
        .ok_or(Error::DiscountCodeNotFound { id: code_id })?;
    guard::require_ambassador(&txn, partner_id).await?;

    if !guard::code_ambassador_link_exists(&txn, code_id, partner_id).await? {
        discount_code_ambassador::ActiveModel {
            discount_code_id: Set(code_id),
            partner_id: Set(partner_id),
        }
        .insert(&txn)
        .await?;
    }

    guard::heal_code_ambassadors(&txn, code_id).await?;
    let ambassadors = get_code_ambassadors(&txn, code_id).await?;

    txn.commit().await?;
    Ok(ambassadors)
}

/// Removes an ambassador from the code's ambassador set. Returns the resulting set.
///
/// The owning ambassador cannot leave the set: it is put back by the auto-heal rule.
pub async fn remove_code_ambassador(
    db: &DatabaseConnection,
    code_id: i64,
    partner_id: i64,
) -> Result<Vec<i64>> {
    let txn = db.begin().await?;

    get_discount_code(&txn, code_id)
        .await?
        .ok_or(Error::DiscountCodeNotFound { id: code_id })?;

    DiscountCodeAmbassador::delete_by_id((code_id, partner_id))
        .exec(&txn)
        .await?;

    guard::heal_code_ambassadors(&txn, code_id).await?;
    let ambassadors = get_code_ambassadors(&txn, code_id).await?;

    txn.commit().await?;
    Ok(ambassadors)
}

/// The ids of the ambassadors in the code's ambassador set, ascending.
pub async fn get_code_ambassadors<C>(db: &C, code_id: i64) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    let links = DiscountCodeAmbassador::find()
        .filter(discount_code_ambassador::Column::DiscountCodeId.eq(code_id))
        .order_by_asc(discount_code_ambassador::Column::PartnerId)
        .all(db)
        .await?;
    Ok(links.into_iter().map(|link| link.partner_id).collect())
}
