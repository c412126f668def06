//! Ambassador business logic - partners, the ambassador flag and owned discount codes.
//!
//! Every mutation of the flag or the owned-code set goes through
//! [`update_ambassador`], which writes the change and then runs the consistency
//! guard inside one transaction. Either everything commits or nothing does.

use crate::{
    core::guard,
    entities::{AmbassadorDiscountCode, DiscountCode, Partner, ambassador_discount_code,
        discount_code, partner},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    QueryOrder, Set, TransactionTrait,
    prelude::*,
    sea_query::{Query, SelectStatement},
};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// How an update changes the owned-code set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CodeChange {
    /// Leave the set as it is
    #[default]
    Keep,
    /// Add these codes (already-owned codes are ignored)
    Add(Vec<i64>),
    /// Remove these codes (codes not owned are ignored)
    Remove(Vec<i64>),
    /// Replace the whole set
    Replace(Vec<i64>),
}

/// A single administrative change to a partner's ambassador data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmbassadorUpdate {
    /// New value of the ambassador flag, `None` keeps the current one
    pub is_ambassador: Option<bool>,
    /// Change to the owned-code set
    pub codes: CodeChange,
}

/// Creates a partner stamped with `now`. New partners are never ambassadors.
pub async fn create_partner(
    db: &DatabaseConnection,
    name: String,
    email: Option<String>,
    now: DateTime<Utc>,
) -> Result<partner::Model> {
    if name.trim().is_empty() {
        return Err(Error::validation("Partner name cannot be empty"));
    }

    let partner = partner::ActiveModel {
        name: Set(name.trim().to_string()),
        email: Set(email),
        is_ambassador: Set(false),
        created_at: Set(now),
        ..Default::default()
    };

    let result = partner.insert(db).await?;
    info!(partner_id = result.id, "Created partner");
    Ok(result)
}

/// Finds a partner by id.
pub async fn get_partner(db: &DatabaseConnection, partner_id: i64) -> Result<Option<partner::Model>> {
    Partner::find_by_id(partner_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All flagged ambassadors, ordered by name.
pub async fn list_ambassadors(db: &DatabaseConnection) -> Result<Vec<partner::Model>> {
    Partner::find()
        .filter(partner::Column::IsAmbassador.eq(true))
        .order_by_asc(partner::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Subquery selecting the ids of the codes owned by `partner_id`.
pub(crate) fn owned_code_ids_query(partner_id: i64) -> SelectStatement {
    Query::select()
        .column(ambassador_discount_code::Column::DiscountCodeId)
        .from(AmbassadorDiscountCode)
        .and_where(ambassador_discount_code::Column::PartnerId.eq(partner_id))
        .to_owned()
}

/// Ids of the partners whose owned-code set contains `code_id`.
pub async fn get_code_owners<C>(db: &C, code_id: i64) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    let links = AmbassadorDiscountCode::find()
        .filter(ambassador_discount_code::Column::DiscountCodeId.eq(code_id))
        .order_by_asc(ambassador_discount_code::Column::PartnerId)
        .all(db)
        .await?;
    Ok(links.into_iter().map(|link| link.partner_id).collect())
}

/// The discount codes in the partner's owned-code set, ordered by code name.
pub async fn get_owned_codes<C>(db: &C, partner_id: i64) -> Result<Vec<discount_code::Model>>
where
    C: ConnectionTrait,
{
    DiscountCode::find()
        .filter(discount_code::Column::Id.in_subquery(owned_code_ids_query(partner_id)))
        .order_by_asc(discount_code::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies `update` to the partner and enforces the ambassador invariants.
///
/// Setting the flag to `false` clears the owned-code set in the same transaction,
/// whatever the set contained before, and detaches the partner from every code
/// it owned or was linked to as an ambassador. If the resulting partner is an
/// ambassador with no codes the whole update is rolled back with
/// [`Error::Validation`].
///
/// Cached statistics are not touched; use
/// [`UsageStats::update_ambassador`](crate::core::stats::UsageStats::update_ambassador)
/// to have them invalidated.
pub async fn update_ambassador(
    db: &DatabaseConnection,
    partner_id: i64,
    update: AmbassadorUpdate,
) -> Result<partner::Model> {
    let txn = db.begin().await?;

    let partner = Partner::find_by_id(partner_id)
        .one(&txn)
        .await?
        .ok_or(Error::PartnerNotFound { id: partner_id })?;
    let was_ambassador = partner.is_ambassador;

    let partner = match update.is_ambassador {
        Some(flag) if flag != was_ambassador => {
            let mut active: partner::ActiveModel = partner.into();
            active.is_ambassador = Set(flag);
            active.update(&txn).await?
        }
        _ => partner,
    };

    apply_code_change(&txn, partner_id, update.codes).await?;

    if update.is_ambassador == Some(false) {
        let removed = guard::clear_owned_codes(&txn, partner_id).await?;
        let (released, unlinked) = guard::release_code_links(&txn, partner_id).await?;
        info!(
            partner_id,
            was_ambassador,
            removed,
            released,
            unlinked,
            "Ambassador status revoked, code links cleared"
        );
    }

    if let Err(e) = guard::validate_ambassador_mutation(&txn, partner_id).await {
        warn!(partner_id, error = %e, "Ambassador update rolled back");
        return Err(e);
    }

    txn.commit().await?;
    info!(partner_id, is_ambassador = partner.is_ambassador, "Ambassador updated");
    Ok(partner)
}

async fn apply_code_change<C>(db: &C, partner_id: i64, change: CodeChange) -> Result<()>
where
    C: ConnectionTrait,
{
    match change {
        CodeChange::Keep => Ok(()),
        CodeChange::Add(code_ids) => link_codes(db, partner_id, &code_ids).await,
        CodeChange::Remove(code_ids) => {
            AmbassadorDiscountCode::delete_many()
                .filter(ambassador_discount_code::Column::PartnerId.eq(partner_id))
                .filter(ambassador_discount_code::Column::DiscountCodeId.is_in(code_ids))
                .exec(db)
                .await?;
            Ok(())
        }
        CodeChange::Replace(code_ids) => {
            guard::clear_owned_codes(db, partner_id).await?;
            link_codes(db, partner_id, &code_ids).await
        }
    }
}

async fn link_codes<C>(db: &C, partner_id: i64, code_ids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    let unique: BTreeSet<i64> = code_ids.iter().copied().collect();

    for code_id in unique {
        DiscountCode::find_by_id(code_id)
            .one(db)
            .await?
            .ok_or(Error::DiscountCodeNotFound { id: code_id })?;

        let existing = AmbassadorDiscountCode::find_by_id((partner_id, code_id))
            .one(db)
            .await?;
        if existing.is_some() {
            continue;
        }

        ambassador_discount_code::ActiveModel {
            partner_id: Set(partner_id),
            discount_code_id: Set(code_id),
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

/// Flags the partner as an ambassador and adds `code_ids` to its owned set.
pub async fn grant_ambassador(
    db: &DatabaseConnection,
    partner_id: i64,
    code_ids: Vec<i64>,
) -> Result<partner::Model> {
    update_ambassador(
        db,
        partner_id,
        AmbassadorUpdate {
            is_ambassador: Some(true),
            codes: CodeChange::Add(code_ids),
        },
    )
    .await
}

/// Removes the ambassador flag; the owned-code set is emptied with it.
pub async fn revoke_ambassador(db: &DatabaseConnection, partner_id: i64) -> Result<partner::Model> {
    update_ambassador(
        db,
        partner_id,
        AmbassadorUpdate {
            is_ambassador: Some(false),
            codes: CodeChange::Keep,
        },
    )
    .await
}

/// Adds codes to the partner's owned set without touching the flag.
pub async fn assign_codes(
    db: &DatabaseConnection,
    partner_id: i64,
    code_ids: Vec<i64>,
) -> Result<partner::Model> {
    update_ambassador(
        db,
        partner_id,
        AmbassadorUpdate {
            is_ambassador: None,
            codes: CodeChange::Add(code_ids),
        },
    )
    .await
}

/// Removes one code from the partner's owned set.
///
/// Removing an ambassador's last code is rejected.
pub async fn unassign_code(
    db: &DatabaseConnection,
    partner_id: i64,
    code_id: i64,
) -> Result<partner::Model> {
    update_ambassador(
        db,
        partner_id,
        AmbassadorUpdate {
            is_ambassador: None,
            codes: CodeChange::Remove(vec![code_id]),
        },
    )
    .await
}

/// Replaces the partner's owned set with exactly `code_ids`.
pub async fn set_owned_codes(
    db: &DatabaseConnection,
    partner_id: i64,
    code_ids: Vec<i64>,
) -> Result<partner::Model> {
    update_ambassador(
        db,
        partner_id,
        AmbassadorUpdate {
            is_ambassador: None,
            codes: CodeChange::Replace(code_ids),
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use proptest::prelude::*;

    fn owned_ids(codes: &[discount_code::Model]) -> Vec<i64> {
        codes.iter().map(|c| c.id).collect()
    }

    #[tokio::test]
    async fn test_create_partner_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_partner(&db, "   ".to_string(), None, test_now()).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { message: _ }));
        assert!(list_ambassadors(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_new_partner_is_not_ambassador() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_partner(
            &db,
            "New Partner".to_string(),
            Some("new@test.com".to_string()),
            test_now(),
        )
        .await?;

        assert!(!partner.is_ambassador);
        assert_eq!(partner.email.as_deref(), Some("new@test.com"));
        assert!(get_owned_codes(&db, partner.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_grant_ambassador_with_code() -> Result<()> {
        let (db, ambassador, code) = setup_with_ambassador().await?;

        assert!(ambassador.is_ambassador);
        assert_eq!(owned_ids(&get_owned_codes(&db, ambassador.id).await?), vec![code.id]);
        assert_eq!(list_ambassadors(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_grant_ambassador_without_code_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_test_partner(&db, "Test Ambassador").await?;

        let result = grant_ambassador(&db, partner.id, Vec::new()).await;
        match result {
            Err(Error::Validation { message }) => {
                assert_eq!(message, guard::AMBASSADOR_WITHOUT_CODES);
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        // Nothing was committed
        let reloaded = get_partner(&db, partner.id).await?.unwrap();
        assert!(!reloaded.is_ambassador);
        Ok(())
    }

    #[tokio::test]
    async fn test_grant_with_unknown_code_rolls_back() -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_test_partner(&db, "Test Ambassador").await?;
        let code = create_test_code(&db, "REAL").await?;

        let result = grant_ambassador(&db, partner.id, vec![code.id, 9999]).await;
        assert!(matches!(result, Err(Error::DiscountCodeNotFound { id: 9999 })));

        let reloaded = get_partner(&db, partner.id).await?.unwrap();
        assert!(!reloaded.is_ambassador);
        assert!(get_owned_codes(&db, partner.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_revoke_clears_owned_codes() -> Result<()> {
        let (db, ambassador, _code) = setup_with_ambassador().await?;
        let second = create_test_code(&db, "SECOND").await?;
        assign_codes(&db, ambassador.id, vec![second.id]).await?;
        assert_eq!(get_owned_codes(&db, ambassador.id).await?.len(), 2);

        let revoked = revoke_ambassador(&db, ambassador.id).await?;

        assert!(!revoked.is_ambassador);
        assert!(get_owned_codes(&db, ambassador.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_revoke_detaches_partner_from_codes() -> Result<()> {
        use crate::core::discount_code as codes;

        let (db, ambassador, code) = setup_with_ambassador().await?;
        let (other, _) = create_test_ambassador(&db, "Other", "OTHERCODE").await?;
        codes::set_code_owner(&db, code.id, Some(ambassador.id)).await?;
        codes::add_code_ambassador(&db, code.id, other.id).await?;

        revoke_ambassador(&db, ambassador.id).await?;

        let code = codes::get_discount_code(&db, code.id).await?.unwrap();
        assert_eq!(code.ambassador_id, None);
        assert_eq!(codes::get_code_ambassadors(&db, code.id).await?, vec![other.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_revoke_and_replace_in_one_update_still_clears() -> Result<()> {
        let (db, ambassador, code) = setup_with_ambassador().await?;

        update_ambassador(
            &db,
            ambassador.id,
            AmbassadorUpdate {
                is_ambassador: Some(false),
                codes: CodeChange::Replace(vec![code.id]),
            },
        )
        .await?;

        assert!(get_owned_codes(&db, ambassador.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unassign_last_code_is_rejected() -> Result<()> {
        let (db, ambassador, code) = setup_with_ambassador().await?;

        let result = unassign_code(&db, ambassador.id, code.id).await;
        assert!(matches!(result, Err(Error::Validation { message: _ })));
        assert_eq!(owned_ids(&get_owned_codes(&db, ambassador.id).await?), vec![code.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unassign_one_of_two_codes() -> Result<()> {
        let (db, ambassador, code) = setup_with_ambassador().await?;
        let second = create_test_code(&db, "SECOND").await?;
        assign_codes(&db, ambassador.id, vec![second.id]).await?;

        unassign_code(&db, ambassador.id, code.id).await?;
        assert_eq!(owned_ids(&get_owned_codes(&db, ambassador.id).await?), vec![second.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_assign_duplicate_code_is_idempotent() -> Result<()> {
        let (db, ambassador, code) = setup_with_ambassador().await?;

        assign_codes(&db, ambassador.id, vec![code.id, code.id]).await?;
        assert_eq!(get_owned_codes(&db, ambassador.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_owned_codes_replaces_set() -> Result<()> {
        let (db, ambassador, _code) = setup_with_ambassador().await?;
        let b = create_test_code(&db, "BBB").await?;
        let a = create_test_code(&db, "AAA").await?;

        set_owned_codes(&db, ambassador.id, vec![b.id, a.id]).await?;
        // Ordered by code name
        assert_eq!(owned_ids(&get_owned_codes(&db, ambassador.id).await?), vec![a.id, b.id]);

        let result = set_owned_codes(&db, ambassador.id, Vec::new()).await;
        assert!(matches!(result, Err(Error::Validation { message: _ })));
        assert_eq!(get_owned_codes(&db, ambassador.id).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_code_owners() -> Result<()> {
        let (db, ambassador, code) = setup_with_ambassador().await?;
        let (other, _) = create_test_ambassador(&db, "Other", "OTHERCODE").await?;
        assert_eq!(get_code_owners(&db, code.id).await?, vec![ambassador.id]);

        assign_codes(&db, other.id, vec![code.id]).await?;
        assert_eq!(get_code_owners(&db, code.id).await?, vec![ambassador.id, other.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_unknown_partner() -> Result<()> {
        let db = setup_test_db().await?;
        let result = revoke_ambassador(&db, 42).await;
        assert!(matches!(result, Err(Error::PartnerNotFound { id: 42 })));
        Ok(())
    }

    #[derive(Debug, Clone)]
    enum Mutation {
        Grant(Vec<usize>),
        Revoke,
        Assign(Vec<usize>),
        Unassign(usize),
        Replace(Vec<usize>),
    }

    fn mutation_strategy() -> impl Strategy<Value = Mutation> {
        let codes = prop::collection::vec(0..4usize, 0..3);
        prop_oneof![
            codes.clone().prop_map(Mutation::Grant),
            Just(Mutation::Revoke),
            codes.clone().prop_map(Mutation::Assign),
            (0..4usize).prop_map(Mutation::Unassign),
            codes.prop_map(Mutation::Replace),
        ]
    }

    async fn run_mutations(mutations: Vec<Mutation>) -> Result<()> {
        let db = setup_test_db().await?;
        let partner = create_test_partner(&db, "Property Partner").await?;
        let mut code_ids = Vec::new();
        for i in 0..4 {
            code_ids.push(create_test_code(&db, &format!("PROP{i}")).await?.id);
        }
        let pick = |indexes: &[usize]| indexes.iter().map(|i| code_ids[*i]).collect::<Vec<_>>();

        for mutation in mutations {
            let result = match &mutation {
                Mutation::Grant(ix) => grant_ambassador(&db, partner.id, pick(ix)).await,
                Mutation::Revoke => revoke_ambassador(&db, partner.id).await,
                Mutation::Assign(ix) => assign_codes(&db, partner.id, pick(ix)).await,
                Mutation::Unassign(i) => unassign_code(&db, partner.id, code_ids[*i]).await,
                Mutation::Replace(ix) => set_owned_codes(&db, partner.id, pick(ix)).await,
            };

            // Only invariant violations may fail
            if let Err(e) = &result {
                assert!(matches!(e, Error::Validation { message: _ }), "{mutation:?}: {e}");
            }

            let current = get_partner(&db, partner.id).await?.unwrap();
            let owned = get_owned_codes(&db, partner.id).await?;
            if current.is_ambassador {
                assert!(!owned.is_empty(), "ambassador without codes after {mutation:?}");
            }
            if matches!(mutation, Mutation::Revoke) {
                assert!(owned.is_empty(), "revoke left codes behind");
            }
        }
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_ambassador_always_owns_a_code(
            mutations in prop::collection::vec(mutation_strategy(), 1..12)
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(run_mutations(mutations)).unwrap();
        }
    }
}
