//! Best-effort notification emitter.
//!
//! A failed insert is logged and swallowed; it must never fail or roll back
//! the lifecycle transition that triggered it.

use serde_json::json;
use tracing::error;

use crate::db::{Notification, Store};
use crate::models::permit::Permit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    PermitApproved,
    PermitRejected,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PermitApproved => "permit_approved",
            Self::PermitRejected => "permit_rejected",
        }
    }
}

pub struct NotificationService {
    store: Store,
}

impl NotificationService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Appends an inbox record for the permit's requester. Best effort.
    pub async fn notify_permit_event(
        &self,
        permit: &Permit,
        kind: NotificationKind,
        actor_name: &str,
        comments: Option<&str>,
    ) {
        let (title, message) = match kind {
            NotificationKind::PermitApproved => (
                "Permit approved",
                format!("\"{}\" was approved by {actor_name}", permit.title),
            ),
            NotificationKind::PermitRejected => (
                "Permit rejected",
                format!("\"{}\" was rejected by {actor_name}", permit.title),
            ),
        };

        let metadata = json!({
            "permit_id": permit.id,
            "permit_number": permit.permit_number,
            "status": permit.status.as_str(),
            "actor": actor_name,
            "comments": comments,
        });

        if let Err(e) = self
            .store
            .create_notification(
                permit.requester_id,
                kind.as_str(),
                title,
                &message,
                Some(&metadata),
            )
            .await
        {
            error!(
                error = %e,
                permit_id = permit.id,
                "Failed to record notification"
            );
        }
    }

    pub async fn list_for_user(&self, user_id: i32) -> anyhow::Result<Vec<Notification>> {
        self.store.list_notifications(user_id).await
    }

    pub async fn unread_count(&self, user_id: i32) -> anyhow::Result<u64> {
        self.store.unread_notification_count(user_id).await
    }

    pub async fn mark_all_read(&self, user_id: i32) -> anyhow::Result<u64> {
        self.store.mark_notifications_read(user_id).await
    }
}
