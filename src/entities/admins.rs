use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "admins")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,

    pub display_name: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// "active" | "inactive"
    pub status: String,

    pub last_login: Option<String>,

    pub prev_login: Option<String>,

    pub active_session_id: Option<String>,

    pub session_created_at: Option<String>,

    pub session_user_agent: Option<String>,

    pub session_ip: Option<String>,

    pub reset_token_hash: Option<String>,

    pub reset_expires: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
