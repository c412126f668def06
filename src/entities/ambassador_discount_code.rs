//! Owned-code link - one row per (ambassador, discount code) pair.
//!
//! The pair is the primary key, so a code can appear at most once in an
//! ambassador's owned-code set.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ambassador → discount code link
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ambassador_discount_codes")]
pub struct Model {
    /// The ambassador owning the code
    #[sea_orm(primary_key, auto_increment = false)]
    pub partner_id: i64,
    /// The owned discount code
    #[sea_orm(primary_key, auto_increment = false)]
    pub discount_code_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Link belongs to one partner
    #[sea_orm(
        belongs_to = "super::partner::Entity",
        from = "Column::PartnerId",
        to = "super::partner::Column::Id",
        on_delete = "Cascade"
    )]
    Partner,
    /// Link points at one discount code
    #[sea_orm(
        belongs_to = "super::discount_code::Entity",
        from = "Column::DiscountCodeId",
        to = "super::discount_code::Column::Id",
        on_delete = "Cascade"
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
