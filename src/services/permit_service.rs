//! Domain service for the permit lifecycle.
//!
//! Pending → `InProgress` | Rejected at pre-review, `InProgress` → Approved |
//! Rejected at finalization. Approved and Rejected are terminal. The permit
//! number is minted exactly once, on the transition into Approved.

use thiserror::Error;

use crate::db::NewPermit;
use crate::models::account::Account;
use crate::models::permit::{Permit, PermitStatus, ReviewEvent};

/// Errors specific to lifecycle operations.
#[derive(Debug, Error)]
pub enum PermitError {
    #[error("Permit not found")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Cannot {event} a permit that is {from}")]
    InvalidTransition {
        from: PermitStatus,
        event: ReviewEvent,
    },

    #[error("Permit is not approved")]
    NotApproved,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for PermitError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for PermitError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Requester decision applied to an `InProgress` permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalDecision {
    Approve,
    Reject,
}

impl FinalDecision {
    #[must_use]
    pub const fn event(self) -> ReviewEvent {
        match self {
            Self::Approve => ReviewEvent::Approve,
            Self::Reject => ReviewEvent::Reject,
        }
    }
}

/// Domain service trait for the permit lifecycle.
#[async_trait::async_trait]
pub trait PermitService: Send + Sync {
    /// Creates a permit in `Pending` for the requester.
    ///
    /// # Errors
    ///
    /// Returns [`PermitError::Validation`] when a required field is missing.
    async fn submit(&self, requester_id: i32, input: NewPermit) -> Result<Permit, PermitError>;

    async fn list_for_requester(&self, requester_id: i32) -> Result<Vec<Permit>, PermitError>;

    async fn get_owned(&self, permit_id: i32, requester_id: i32) -> Result<Permit, PermitError>;

    /// Permits awaiting pre-review.
    async fn list_pending(&self) -> Result<Vec<Permit>, PermitError>;

    /// Pre-approval: `Pending` → `InProgress`. Notifies the requester.
    async fn pre_approve(
        &self,
        permit_id: i32,
        actor: &Account,
        comments: Option<String>,
    ) -> Result<Permit, PermitError>;

    /// Pre-rejection: `Pending` → `Rejected`. Notifies the requester.
    async fn pre_reject(
        &self,
        permit_id: i32,
        actor: &Account,
        comments: Option<String>,
    ) -> Result<Permit, PermitError>;

    /// Owner-scoped finalization of an `InProgress` permit. Approval mints the
    /// permit number through the per-day counter; rejection notifies.
    async fn finalize(
        &self,
        permit_id: i32,
        requester: &Account,
        decision: FinalDecision,
    ) -> Result<Permit, PermitError>;

    /// Renders the printable artifact for an approved permit owned by the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns [`PermitError::NotApproved`] unless the permit is `Approved`.
    async fn render_pdf(&self, permit_id: i32, requester_id: i32) -> Result<Vec<u8>, PermitError>;
}
