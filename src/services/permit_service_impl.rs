//! `SeaORM`-backed implementation of the permit lifecycle.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{NewPermit, StampInput, Store};
use crate::models::account::Account;
use crate::models::permit::{Permit, PermitStatus, ReviewEvent, day_key, format_permit_number};
use crate::services::notify::{NotificationKind, NotificationService};
use crate::services::pdf::PermitRenderer;
use crate::services::permit_service::{FinalDecision, PermitError, PermitService};

pub struct SeaOrmPermitService {
    store: Store,
    notifications: Arc<NotificationService>,
    renderer: Arc<dyn PermitRenderer>,
}

impl SeaOrmPermitService {
    #[must_use]
    pub fn new(
        store: Store,
        notifications: Arc<NotificationService>,
        renderer: Arc<dyn PermitRenderer>,
    ) -> Self {
        Self {
            store,
            notifications,
            renderer,
        }
    }

    fn require_transition(
        permit: &Permit,
        event: ReviewEvent,
    ) -> Result<PermitStatus, PermitError> {
        permit
            .status
            .transition(event)
            .ok_or(PermitError::InvalidTransition {
                from: permit.status,
                event,
            })
    }

    async fn pre_review(
        &self,
        permit_id: i32,
        actor: &Account,
        comments: Option<String>,
        event: ReviewEvent,
        kind: NotificationKind,
    ) -> Result<Permit, PermitError> {
        let permit = self
            .store
            .get_permit(permit_id)
            .await?
            .ok_or(PermitError::NotFound)?;

        let next = Self::require_transition(&permit, event)?;
        let now = Utc::now().to_rfc3339();

        let stamp = StampInput {
            actor_id: actor.id,
            actor_name: &actor.display_name,
            at: &now,
            comments: comments.as_deref(),
        };

        // Conditional on the stored status so a concurrent reviewer cannot
        // stamp the same stage twice.
        let applied = self
            .store
            .record_pre_review(permit_id, permit.status, next, &stamp)
            .await?;
        if !applied {
            return Err(PermitError::InvalidTransition {
                from: permit.status,
                event,
            });
        }

        let updated = self
            .store
            .get_permit(permit_id)
            .await?
            .ok_or(PermitError::NotFound)?;

        self.notifications
            .notify_permit_event(&updated, kind, &actor.display_name, comments.as_deref())
            .await;

        Ok(updated)
    }
}

#[async_trait]
impl PermitService for SeaOrmPermitService {
    async fn submit(&self, requester_id: i32, input: NewPermit) -> Result<Permit, PermitError> {
        let required = [
            ("title", &input.title),
            ("work_description", &input.work_description),
            ("terminal", &input.terminal),
            ("window_start", &input.window_start),
            ("window_end", &input.window_end),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(PermitError::Validation(format!("{name} is required")));
            }
        }

        let permit = self.store.create_permit(requester_id, &input).await?;
        Ok(permit)
    }

    async fn list_for_requester(&self, requester_id: i32) -> Result<Vec<Permit>, PermitError> {
        Ok(self.store.list_permits_for_requester(requester_id).await?)
    }

    async fn get_owned(&self, permit_id: i32, requester_id: i32) -> Result<Permit, PermitError> {
        self.store
            .get_owned_permit(permit_id, requester_id)
            .await?
            .ok_or(PermitError::NotFound)
    }

    async fn list_pending(&self) -> Result<Vec<Permit>, PermitError> {
        Ok(self
            .store
            .list_permits_by_status(PermitStatus::Pending)
            .await?)
    }

    async fn pre_approve(
        &self,
        permit_id: i32,
        actor: &Account,
        comments: Option<String>,
    ) -> Result<Permit, PermitError> {
        self.pre_review(
            permit_id,
            actor,
            comments,
            ReviewEvent::PreApprove,
            NotificationKind::PermitApproved,
        )
        .await
    }

    async fn pre_reject(
        &self,
        permit_id: i32,
        actor: &Account,
        comments: Option<String>,
    ) -> Result<Permit, PermitError> {
        self.pre_review(
            permit_id,
            actor,
            comments,
            ReviewEvent::PreReject,
            NotificationKind::PermitRejected,
        )
        .await
    }

    async fn finalize(
        &self,
        permit_id: i32,
        requester: &Account,
        decision: FinalDecision,
    ) -> Result<Permit, PermitError> {
        let permit = self
            .store
            .get_owned_permit(permit_id, requester.id)
            .await?
            .ok_or(PermitError::NotFound)?;

        let event = decision.event();
        let next = Self::require_transition(&permit, event)?;

        let now = Utc::now();
        let now_str = now.to_rfc3339();

        // The serial comes from a single atomic upsert; concurrent approvals
        // in the same second cannot observe the same value.
        let permit_number = if decision == FinalDecision::Approve && permit.permit_number.is_none()
        {
            let serial = self.store.next_permit_serial(&day_key(now)).await?;
            Some(format_permit_number(now, serial))
        } else {
            None
        };

        let stamp = StampInput {
            actor_id: requester.id,
            actor_name: &requester.display_name,
            at: &now_str,
            comments: None,
        };

        let applied = self
            .store
            .record_final(
                permit_id,
                permit.status,
                next,
                permit_number.as_deref(),
                &stamp,
            )
            .await?;
        if !applied {
            return Err(PermitError::InvalidTransition {
                from: permit.status,
                event,
            });
        }

        let updated = self
            .store
            .get_owned_permit(permit_id, requester.id)
            .await?
            .ok_or(PermitError::NotFound)?;

        if decision == FinalDecision::Reject {
            self.notifications
                .notify_permit_event(
                    &updated,
                    NotificationKind::PermitRejected,
                    &requester.display_name,
                    None,
                )
                .await;
        }

        Ok(updated)
    }

    async fn render_pdf(&self, permit_id: i32, requester_id: i32) -> Result<Vec<u8>, PermitError> {
        let permit = self
            .store
            .get_owned_permit(permit_id, requester_id)
            .await?
            .ok_or(PermitError::NotFound)?;

        if permit.status != PermitStatus::Approved {
            return Err(PermitError::NotApproved);
        }

        Ok(self.renderer.render(&permit))
    }
}
