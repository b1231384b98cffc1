use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "permits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning requester; immutable after creation.
    pub requester_id: i32,

    pub title: String,

    pub work_description: String,

    pub terminal: String,

    pub window_start: String,

    pub window_end: String,

    /// JSON array of risk-assessment flags.
    pub risk_flags: Option<String>,

    pub risk_reasons: Option<String>,

    /// JSON array of stored attachment references.
    pub attachments: Option<String>,

    /// "pending" | "in_progress" | "approved" | "rejected"
    pub status: String,

    /// Null until approved; unique and immutable once set.
    #[sea_orm(unique)]
    pub permit_number: Option<String>,

    pub pre_approved_by: Option<i32>,

    pub pre_approved_by_name: Option<String>,

    pub pre_approved_at: Option<String>,

    pub pre_approval_comments: Option<String>,

    pub approved_by: Option<i32>,

    pub approved_by_name: Option<String>,

    pub approved_at: Option<String>,

    pub approval_comments: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::requesters::Entity",
        from = "Column::RequesterId",
        to = "super::requesters::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Requesters,
}

impl Related<super::requesters::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requesters.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
