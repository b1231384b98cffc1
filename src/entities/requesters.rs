use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "requesters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Stored lower-cased; lookups normalize before comparing.
    #[sea_orm(unique)]
    pub email: String,

    pub display_name: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// "active" | "inactive"
    pub status: String,

    pub last_login: Option<String>,

    /// Value of `last_login` before the current login; shown as "last session".
    pub prev_login: Option<String>,

    /// The one session id currently authorized to act as this account.
    pub active_session_id: Option<String>,

    pub session_created_at: Option<String>,

    pub session_user_agent: Option<String>,

    pub session_ip: Option<String>,

    /// SHA-256 digest of the raw reset token, never the token itself.
    pub reset_token_hash: Option<String>,

    pub reset_expires: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::permits::Entity")]
    Permits,
    #[sea_orm(has_many = "super::notifications::Entity")]
    Notifications,
}

impl Related<super::permits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Permits.def()
    }
}

impl Related<super::notifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
