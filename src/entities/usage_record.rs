//! Usage record entity - one logged redemption of a discount code.
//!
//! Each record references the ambassador the code is attributed to, the code
//! itself, the date of use and a lifecycle `state`
//! (`draft` → `abandoned` | `sale`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a usage record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum UsageState {
    /// Code applied to a cart that is still open
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Cart was abandoned
    #[sea_orm(string_value = "abandoned")]
    Abandoned,
    /// Order was validated
    #[sea_orm(string_value = "sale")]
    Sale,
}

impl UsageState {
    /// Terminal states never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Abandoned | Self::Sale)
    }
}

impl fmt::Display for UsageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}

/// Usage record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usage_records")]
pub struct Model {
    /// Unique identifier for the record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Ambassador the usage is attributed to
    pub partner_id: i64,
    /// Discount code that was used
    pub discount_code_id: i64,
    /// Date the code was used
    pub usage_date: Date,
    /// Lifecycle status
    pub state: UsageState,
    /// When the record was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `UsageRecord` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each record belongs to one ambassador
    #[sea_orm(
        belongs_to = "super::partner::Entity",
        from = "Column::PartnerId",
        to = "super::partner::Column::Id"
    )]
    Partner,
    /// Each record belongs to one discount code
    #[sea_orm(
        belongs_to = "super::discount_code::Entity",
        from = "Column::DiscountCodeId",
        to = "super::discount_code::Column::Id"
    )]
    DiscountCode,
}

impl Related<super::partner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Partner.def()
    }
}

impl Related<super::discount_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DiscountCode.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
