use sea_orm::entity::prelude::*;

/// One row per calendar day, incremented atomically to serialize
/// permit-number assignment.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "permit_counters")]
pub struct Model {
    /// Day key in `DDMMYYYY` form.
    #[sea_orm(primary_key, auto_increment = false)]
    pub day: String,

    pub value: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
