use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;

use crate::entities::permits;
use crate::models::permit::{Permit, PermitStatus, ReviewStamp};

/// Fields supplied at submission time. Everything else is review state owned
/// by the lifecycle.
#[derive(Debug, Clone, Default)]
pub struct NewPermit {
    pub title: String,
    pub work_description: String,
    pub terminal: String,
    pub window_start: String,
    pub window_end: String,
    pub risk_flags: Vec<String>,
    pub risk_reasons: Option<String>,
    pub attachments: Vec<String>,
}

/// One review stamp to persist alongside a status change.
#[derive(Debug, Clone)]
pub struct StampInput<'a> {
    pub actor_id: i32,
    pub actor_name: &'a str,
    pub at: &'a str,
    pub comments: Option<&'a str>,
}

fn decode_json_list(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

fn encode_json_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        serde_json::to_string(items).ok()
    }
}

fn map_permit_model(m: permits::Model) -> Permit {
    let pre_approval = match (&m.pre_approved_by, &m.pre_approved_at) {
        (Some(actor_id), Some(at)) => Some(ReviewStamp {
            actor_id: *actor_id,
            actor_name: m.pre_approved_by_name.clone().unwrap_or_default(),
            at: at.clone(),
            comments: m.pre_approval_comments.clone(),
        }),
        _ => None,
    };

    let approval = match (&m.approved_by, &m.approved_at) {
        (Some(actor_id), Some(at)) => Some(ReviewStamp {
            actor_id: *actor_id,
            actor_name: m.approved_by_name.clone().unwrap_or_default(),
            at: at.clone(),
            comments: m.approval_comments.clone(),
        }),
        _ => None,
    };

    Permit {
        id: m.id,
        requester_id: m.requester_id,
        title: m.title,
        description: m.work_description,
        terminal: m.terminal,
        window_start: m.window_start,
        window_end: m.window_end,
        risk_flags: decode_json_list(m.risk_flags.as_deref()),
        risk_reasons: m.risk_reasons,
        attachments: decode_json_list(m.attachments.as_deref()),
        status: PermitStatus::parse(&m.status).unwrap_or(PermitStatus::Pending),
        permit_number: m.permit_number,
        pre_approval,
        approval,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

pub struct PermitRepository {
    conn: DatabaseConnection,
}

impl PermitRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, requester_id: i32, input: &NewPermit) -> Result<Permit> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = permits::ActiveModel {
            requester_id: Set(requester_id),
            title: Set(input.title.clone()),
            work_description: Set(input.work_description.clone()),
            terminal: Set(input.terminal.clone()),
            window_start: Set(input.window_start.clone()),
            window_end: Set(input.window_end.clone()),
            risk_flags: Set(encode_json_list(&input.risk_flags)),
            risk_reasons: Set(input.risk_reasons.clone()),
            attachments: Set(encode_json_list(&input.attachments)),
            status: Set(PermitStatus::Pending.as_str().to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        info!(permit_id = model.id, requester_id, "Permit submitted");
        Ok(map_permit_model(model))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Permit>> {
        let model = permits::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query permit")?;
        Ok(model.map(map_permit_model))
    }

    pub async fn get_owned(&self, id: i32, requester_id: i32) -> Result<Option<Permit>> {
        let model = permits::Entity::find_by_id(id)
            .filter(permits::Column::RequesterId.eq(requester_id))
            .one(&self.conn)
            .await
            .context("Failed to query owned permit")?;
        Ok(model.map(map_permit_model))
    }

    pub async fn list_for_requester(&self, requester_id: i32) -> Result<Vec<Permit>> {
        let rows = permits::Entity::find()
            .filter(permits::Column::RequesterId.eq(requester_id))
            .order_by_desc(permits::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list permits for requester")?;
        Ok(rows.into_iter().map(map_permit_model).collect())
    }

    pub async fn list_by_status(&self, status: PermitStatus) -> Result<Vec<Permit>> {
        let rows = permits::Entity::find()
            .filter(permits::Column::Status.eq(status.as_str()))
            .order_by_asc(permits::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list permits by status")?;
        Ok(rows.into_iter().map(map_permit_model).collect())
    }

    /// Writes the pre-review stamp and the new status, conditional on the
    /// permit still being in `expected`. Returns false when the row was
    /// concurrently moved out of `expected` (no write happens in that case).
    pub async fn record_pre_review(
        &self,
        id: i32,
        expected: PermitStatus,
        next: PermitStatus,
        stamp: &StampInput<'_>,
    ) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = permits::Entity::update_many()
            .col_expr(
                permits::Column::Status,
                sea_orm::sea_query::Expr::value(next.as_str()),
            )
            .col_expr(
                permits::Column::PreApprovedBy,
                sea_orm::sea_query::Expr::value(stamp.actor_id),
            )
            .col_expr(
                permits::Column::PreApprovedByName,
                sea_orm::sea_query::Expr::value(stamp.actor_name),
            )
            .col_expr(
                permits::Column::PreApprovedAt,
                sea_orm::sea_query::Expr::value(stamp.at),
            )
            .col_expr(
                permits::Column::PreApprovalComments,
                sea_orm::sea_query::Expr::value(stamp.comments.map(str::to_string)),
            )
            .col_expr(
                permits::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(now),
            )
            .filter(permits::Column::Id.eq(id))
            .filter(permits::Column::Status.eq(expected.as_str()))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Writes the final stamp, the new status and (on approval) the permit
    /// number, conditional on the current status. The number column is only
    /// touched when a value is supplied, and only if it is still unset, so a
    /// retried approval can never reassign it.
    pub async fn record_final(
        &self,
        id: i32,
        expected: PermitStatus,
        next: PermitStatus,
        permit_number: Option<&str>,
        stamp: &StampInput<'_>,
    ) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();

        let mut update = permits::Entity::update_many()
            .col_expr(
                permits::Column::Status,
                sea_orm::sea_query::Expr::value(next.as_str()),
            )
            .col_expr(
                permits::Column::ApprovedBy,
                sea_orm::sea_query::Expr::value(stamp.actor_id),
            )
            .col_expr(
                permits::Column::ApprovedByName,
                sea_orm::sea_query::Expr::value(stamp.actor_name),
            )
            .col_expr(
                permits::Column::ApprovedAt,
                sea_orm::sea_query::Expr::value(stamp.at),
            )
            .col_expr(
                permits::Column::ApprovalComments,
                sea_orm::sea_query::Expr::value(stamp.comments.map(str::to_string)),
            )
            .col_expr(
                permits::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(now),
            )
            .filter(permits::Column::Id.eq(id))
            .filter(permits::Column::Status.eq(expected.as_str()));

        if let Some(number) = permit_number {
            update = update
                .col_expr(
                    permits::Column::PermitNumber,
                    sea_orm::sea_query::Expr::value(number),
                )
                .filter(permits::Column::PermitNumber.is_null());
        }

        let result = update.exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
