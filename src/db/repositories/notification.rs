use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::notifications;

/// Inbox record handed to the UI. Mutable only through the read-sweep.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}

fn map_notification_model(m: notifications::Model) -> Notification {
    Notification {
        id: m.id,
        user_id: m.user_id,
        kind: m.kind,
        title: m.title,
        message: m.message,
        read: m.read,
        metadata: m.metadata.as_deref().and_then(|s| serde_json::from_str(s).ok()),
        created_at: m.created_at,
    }
}

pub struct NotificationRepository {
    conn: DatabaseConnection,
}

impl NotificationRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        user_id: i32,
        kind: &str,
        title: &str,
        message: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<i32> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = notifications::ActiveModel {
            user_id: Set(user_id),
            kind: Set(kind.to_string()),
            title: Set(title.to_string()),
            message: Set(message.to_string()),
            read: Set(false),
            metadata: Set(metadata.map(std::string::ToString::to_string)),
            created_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        Ok(model.id)
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<Notification>> {
        let rows = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id))
            .order_by_desc(notifications::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list notifications")?;
        Ok(rows.into_iter().map(map_notification_model).collect())
    }

    pub async fn unread_count(&self, user_id: i32) -> Result<u64> {
        let count = notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id))
            .filter(notifications::Column::Read.eq(false))
            .count(&self.conn)
            .await
            .context("Failed to count unread notifications")?;
        Ok(count)
    }

    /// Read-sweep: flips every unread flag for the user. Records are never
    /// physically removed.
    pub async fn mark_all_read(&self, user_id: i32) -> Result<u64> {
        let result = notifications::Entity::update_many()
            .col_expr(
                notifications::Column::Read,
                sea_orm::sea_query::Expr::value(true),
            )
            .filter(notifications::Column::UserId.eq(user_id))
            .filter(notifications::Column::Read.eq(false))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}
