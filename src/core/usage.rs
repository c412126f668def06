//! Usage record business logic - logging code redemptions and their lifecycle.
//!
//! A record starts as `draft` and may move once, to `abandoned` or `sale`.
//! These functions only touch the store; callers that serve statistics should go
//! through [`crate::core::stats::UsageStats`] so cached results are invalidated.

use crate::{
    core::{discount_code, guard},
    entities::{UsageRecord, UsageState, usage_record},
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// A redemption to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUsage {
    /// Ambassador the usage is attributed to
    pub partner_id: i64,
    /// Code that was used
    pub discount_code_id: i64,
    /// Date of use; defaults to today
    pub usage_date: Option<NaiveDate>,
    /// Initial state; defaults to `draft`
    pub state: Option<UsageState>,
}

impl NewUsage {
    /// A draft usage of `discount_code_id` by `partner_id`, dated today.
    #[must_use]
    pub const fn new(partner_id: i64, discount_code_id: i64) -> Self {
        Self {
            partner_id,
            discount_code_id,
            usage_date: None,
            state: None,
        }
    }

    /// Sets the date of use.
    #[must_use]
    pub fn on(mut self, usage_date: NaiveDate) -> Self {
        self.usage_date = Some(usage_date);
        self
    }

    /// Sets the initial state.
    #[must_use]
    pub fn with_state(mut self, state: UsageState) -> Self {
        self.state = Some(state);
        self
    }
}

/// Writes a usage record stamped at `now`.
///
/// The partner must be a flagged ambassador and the code must exist.
pub async fn create_usage_record(
    db: &DatabaseConnection,
    usage: NewUsage,
    now: DateTime<Utc>,
) -> Result<usage_record::Model> {
    guard::require_ambassador(db, usage.partner_id).await?;
    discount_code::get_discount_code(db, usage.discount_code_id)
        .await?
        .ok_or(Error::DiscountCodeNotFound {
            id: usage.discount_code_id,
        })?;

    let record = usage_record::ActiveModel {
        partner_id: Set(usage.partner_id),
        discount_code_id: Set(usage.discount_code_id),
        usage_date: Set(usage.usage_date.unwrap_or_else(|| now.date_naive())),
        state: Set(usage.state.unwrap_or(UsageState::Draft)),
        created_at: Set(now),
        ..Default::default()
    };

    let result = record.insert(db).await?;
    info!(
        record_id = result.id,
        partner_id = result.partner_id,
        code_id = result.discount_code_id,
        state = %result.state,
        "Recorded discount code usage"
    );
    Ok(result)
}

/// Finds a usage record by id.
pub async fn get_usage_record(
    db: &DatabaseConnection,
    record_id: i64,
) -> Result<Option<usage_record::Model>> {
    UsageRecord::find_by_id(record_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Checks whether a record may move from `from` to `to`.
///
/// Only `draft → abandoned` and `draft → sale` are allowed; staying in the same
/// state is accepted as a no-op.
pub fn check_transition(from: UsageState, to: UsageState) -> Result<()> {
    if from == to || (from == UsageState::Draft && to.is_terminal()) {
        return Ok(());
    }
    Err(Error::InvalidStateTransition {
        from: from.to_string(),
        to: to.to_string(),
    })
}

/// Moves a usage record to `state`.
pub async fn transition_usage_state(
    db: &DatabaseConnection,
    record_id: i64,
    state: UsageState,
) -> Result<usage_record::Model> {
    let record = get_usage_record(db, record_id)
        .await?
        .ok_or(Error::UsageRecordNotFound { id: record_id })?;

    check_transition(record.state, state)?;
    if record.state == state {
        return Ok(record);
    }

    let from = record.state;
    let mut active: usage_record::ActiveModel = record.into();
    active.state = Set(state);
    let updated = active.update(db).await?;

    info!(record_id, %from, to = %state, "Usage record state changed");
    Ok(updated)
}

/// Usage records of one code, newest usage date first.
pub async fn list_usage_for_code(
    db: &DatabaseConnection,
    code_id: i64,
) -> Result<Vec<usage_record::Model>> {
    UsageRecord::find()
        .filter(usage_record::Column::DiscountCodeId.eq(code_id))
        .order_by_desc(usage_record::Column::UsageDate)
        .order_by_desc(usage_record::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_check_transition() {
        use UsageState::{Abandoned, Draft, Sale};

        assert!(check_transition(Draft, Sale).is_ok());
        assert!(check_transition(Draft, Abandoned).is_ok());
        assert!(check_transition(Sale, Sale).is_ok());
        assert!(check_transition(Sale, Draft).is_err());
        assert!(check_transition(Abandoned, Sale).is_err());
        assert!(check_transition(Sale, Abandoned).is_err());
    }

    #[tokio::test]
    async fn test_create_usage_defaults() -> Result<()> {
        let (db, ambassador, code) = setup_with_ambassador().await?;
        let now = test_now();

        let record = create_usage_record(&db, NewUsage::new(ambassador.id, code.id), now).await?;

        assert_eq!(record.state, UsageState::Draft);
        assert_eq!(record.usage_date, now.date_naive());
        assert_eq!(record.created_at, now);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_usage_requires_ambassador() -> Result<()> {
        let (db, _ambassador, code) = setup_with_ambassador().await?;
        let regular = create_test_partner(&db, "Regular").await?;

        let result =
            create_usage_record(&db, NewUsage::new(regular.id, code.id), test_now()).await;
        assert!(matches!(result, Err(Error::NotAnAmbassador { id: _ })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_usage_requires_code() -> Result<()> {
        let (db, ambassador, _code) = setup_with_ambassador().await?;

        let result = create_usage_record(&db, NewUsage::new(ambassador.id, 555), test_now()).await;
        assert!(matches!(result, Err(Error::DiscountCodeNotFound { id: 555 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_transition_usage_state() -> Result<()> {
        let (db, ambassador, code) = setup_with_ambassador().await?;
        let record =
            create_usage_record(&db, NewUsage::new(ambassador.id, code.id), test_now()).await?;

        let sold = transition_usage_state(&db, record.id, UsageState::Sale).await?;
        assert_eq!(sold.state, UsageState::Sale);

        let result = transition_usage_state(&db, record.id, UsageState::Abandoned).await;
        assert!(matches!(
            result,
            Err(Error::InvalidStateTransition { from: _, to: _ })
        ));

        let reloaded = get_usage_record(&db, record.id).await?.unwrap();
        assert_eq!(reloaded.state, UsageState::Sale);
        Ok(())
    }

    #[tokio::test]
    async fn test_transition_unknown_record() -> Result<()> {
        let db = setup_test_db().await?;
        let result = transition_usage_state(&db, 3, UsageState::Sale).await;
        assert!(matches!(result, Err(Error::UsageRecordNotFound { id: 3 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_usage_for_code_newest_first() -> Result<()> {
        let (db, ambassador, code) = setup_with_ambassador().await?;
        let now = test_now();
        for day in [3, 20, 11] {
            let usage = NewUsage::new(ambassador.id, code.id).on(date(2024, 1, day));
            create_usage_record(&db, usage, now).await?;
        }

        let records = list_usage_for_code(&db, code.id).await?;
        let days: Vec<NaiveDate> = records.iter().map(|r| r.usage_date).collect();
        assert_eq!(days, vec![date(2024, 1, 20), date(2024, 1, 11), date(2024, 1, 3)]);
        Ok(())
    }
}
