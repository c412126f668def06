//! Discount code entity - a promotional code that can be attributed to an ambassador.
//!
//! `ambassador_id` is the primary (owning) ambassador. The wider set of ambassadors
//! allowed to promote the code is stored in `discount_code_ambassadors`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Discount code database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discount_codes")]
pub struct Model {
    /// Unique identifier for the code
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The code customers type at checkout (e.g. `"SUMMER10"`)
    #[sea_orm(unique)]
    pub name: String,
    /// Owning ambassador, if any
    pub ambassador_id: Option<i64>,
    /// When the code was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `DiscountCode` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each code may belong to one owning ambassador
    #[sea_orm(
        belongs_to = "super::partner::Entity",
        from = "Column::AmbassadorId",
        to = "super::partner::Column::Id"
    )]
    Owner,
    /// One code has many usage records
    #[sea_orm(has_many = "super::usage_record::Entity")]
    UsageRecords,
}

impl Related<super::partner::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::usage_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsageRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
