//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod ambassador_discount_code;
pub mod discount_code;
pub mod discount_code_ambassador;
pub mod partner;
pub mod usage_record;

// Re-export specific types to avoid conflicts
pub use ambassador_discount_code::{
    Column as AmbassadorDiscountCodeColumn, Entity as AmbassadorDiscountCode,
    Model as AmbassadorDiscountCodeModel,
};
pub use discount_code::{
    Column as DiscountCodeColumn, Entity as DiscountCode, Model as DiscountCodeModel,
};
pub use discount_code_ambassador::{
    Column as DiscountCodeAmbassadorColumn, Entity as DiscountCodeAmbassador,
    Model as DiscountCodeAmbassadorModel,
};
pub use partner::{Column as PartnerColumn, Entity as Partner, Model as PartnerModel};
pub use usage_record::{
    Column as UsageRecordColumn, Entity as UsageRecord, Model as UsageRecordModel, UsageState,
};
