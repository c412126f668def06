//! Consistency guard for ambassador ↔ discount code links.
//!
//! These checks run inside the caller's database transaction, after the
//! mutation has been written and before it is committed. A failing check
//! returns an error and the caller drops the transaction, which rolls it back.
//!
//! Rules:
//! 1. A flagged ambassador owns at least one discount code.
//! 2. A code's owning ambassador is always part of the code's ambassador set
//!    (repaired here, never rejected).
//! 3. Revoking the ambassador flag empties the owned-code set, clears the
//!    partner as owner of any code and removes it from every code's ambassador
//!    set (see [`clear_owned_codes`] and [`release_code_links`]).

use crate::{
    entities::{
        AmbassadorDiscountCode, DiscountCode, DiscountCodeAmbassador, Partner,
        ambassador_discount_code, discount_code, discount_code_ambassador, partner,
    },
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, Set, prelude::*, sea_query::Expr};
use tracing::{info, warn};

/// Message returned when rule 1 rejects a mutation.
pub const AMBASSADOR_WITHOUT_CODES: &str =
    "An ambassador must have at least one discount code assigned.";

/// Checks rule 1 for `partner_id` against the state visible in `db`.
pub async fn validate_ambassador_mutation<C>(db: &C, partner_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let partner = Partner::find_by_id(partner_id)
        .one(db)
        .await?
        .ok_or(Error::PartnerNotFound { id: partner_id })?;

    if !partner.is_ambassador {
        return Ok(());
    }

    let owned = AmbassadorDiscountCode::find()
        .filter(ambassador_discount_code::Column::PartnerId.eq(partner_id))
        .count(db)
        .await?;

    if owned == 0 {
        warn!(partner_id, "Rejected mutation: ambassador without discount codes");
        return Err(Error::validation(AMBASSADOR_WITHOUT_CODES));
    }

    Ok(())
}

/// Removes every owned-code link of `partner_id`. Returns the number of links removed.
pub async fn clear_owned_codes<C>(db: &C, partner_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = AmbassadorDiscountCode::delete_many()
        .filter(ambassador_discount_code::Column::PartnerId.eq(partner_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Drops `partner_id` as owner of every code it owns and removes it from every
/// code's ambassador set. Returns (codes released, ambassador-set links removed).
pub async fn release_code_links<C>(db: &C, partner_id: i64) -> Result<(u64, u64)>
where
    C: ConnectionTrait,
{
    let released = DiscountCode::update_many()
        .col_expr(discount_code::Column::AmbassadorId, Expr::value(Option::<i64>::None))
        .filter(discount_code::Column::AmbassadorId.eq(partner_id))
        .exec(db)
        .await?;

    let unlinked = DiscountCodeAmbassador::delete_many()
        .filter(discount_code_ambassador::Column::PartnerId.eq(partner_id))
        .exec(db)
        .await?;

    Ok((released.rows_affected, unlinked.rows_affected))
}

/// Applies rule 2 to `code_id`: if the code has an owner missing from its
/// ambassador set, the owner is added.
///
/// Returns `true` when the set had to be repaired.
pub async fn heal_code_ambassadors<C>(db: &C, code_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let code = DiscountCode::find_by_id(code_id)
        .one(db)
        .await?
        .ok_or(Error::DiscountCodeNotFound { id: code_id })?;

    let Some(owner_id) = code.ambassador_id else {
        return Ok(false);
    };

    if code_ambassador_link_exists(db, code_id, owner_id).await? {
        return Ok(false);
    }

    discount_code_ambassador::ActiveModel {
        discount_code_id: Set(code_id),
        partner_id: Set(owner_id),
    }
    .insert(db)
    .await?;

    info!(code_id, owner_id, "Added owning ambassador to code's ambassador set");
    Ok(true)
}

/// Loads `partner_id` and fails unless it is a flagged ambassador.
pub async fn require_ambassador<C>(db: &C, partner_id: i64) -> Result<partner::Model>
where
    C: ConnectionTrait,
{
    let partner = Partner::find_by_id(partner_id)
        .one(db)
        .await?
        .ok_or(Error::PartnerNotFound { id: partner_id })?;

    if !partner.is_ambassador {
        return Err(Error::NotAnAmbassador { id: partner_id });
    }

    Ok(partner)
}

pub(crate) async fn code_ambassador_link_exists<C>(
    db: &C,
    code_id: i64,
    partner_id: i64,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let existing = DiscountCodeAmbassador::find_by_id((code_id, partner_id))
        .one(db)
        .await?;
    Ok(existing.is_some())
}
