//! Partner entity - a customer record that may be flagged as an ambassador.
//!
//! Ambassadors are partners with `is_ambassador` set. Their owned discount codes
//! live in the `ambassador_discount_codes` association table, never on this row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Partner database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "partners")]
pub struct Model {
    /// Unique identifier for the partner
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Contact email, if known
    pub email: Option<String>,
    /// Whether this partner receives ambassador usage reporting
    pub is_ambassador: bool,
    /// When the partner was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Partner and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One partner has many owned-code links
    #[sea_orm(has_many = "super::ambassador_discount_code::Entity")]
    OwnedCodes,
    /// One partner has many usage records
    #[sea_orm(has_many = "super::usage_record::Entity")]
    UsageRecords,
}

impl Related<super::ambassador_discount_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OwnedCodes.def()
    }
}

impl Related<super::usage_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsageRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
