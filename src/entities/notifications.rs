use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    /// "permit_approved" | "permit_rejected"
    pub kind: String,

    pub title: String,

    pub message: String,

    pub read: bool,

    /// JSON blob: permit id/number, status, actor name, comments.
    pub metadata: Option<String>,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::requesters::Entity",
        from = "Column::UserId",
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
