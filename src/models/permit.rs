use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::PERMIT_NUMBER_PREFIX;

/// Review status of a permit. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitStatus {
    Pending,
    InProgress,
    Approved,
    Rejected,
}

impl PermitStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Legal transition table. Returns the successor status, or `None` when
    /// the event is not allowed from the current status.
    #[must_use]
    pub const fn transition(self, event: ReviewEvent) -> Option<Self> {
        match (self, event) {
            (Self::Pending, ReviewEvent::PreApprove) => Some(Self::InProgress),
            (Self::Pending, ReviewEvent::PreReject)
            | (Self::InProgress, ReviewEvent::Reject) => Some(Self::Rejected),
            (Self::InProgress, ReviewEvent::Approve) => Some(Self::Approved),
            _ => None,
        }
    }
}

impl std::fmt::Display for PermitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events driving the lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewEvent {
    PreApprove,
    PreReject,
    Approve,
    Reject,
}

impl ReviewEvent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreApprove => "pre_approve",
            Self::PreReject => "pre_reject",
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl std::fmt::Display for ReviewEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One review stamp: who acted, when, and with what comment. Written at most
/// once per stage.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewStamp {
    pub actor_id: i32,
    pub actor_name: String,
    pub at: String,
    pub comments: Option<String>,
}

/// Domain view of a permit record.
#[derive(Debug, Clone)]
pub struct Permit {
    pub id: i32,
    pub requester_id: i32,
    pub title: String,
    pub description: String,
    pub terminal: String,
    pub window_start: String,
    pub window_end: String,
    pub risk_flags: Vec<String>,
    pub risk_reasons: Option<String>,
    pub attachments: Vec<String>,
    pub status: PermitStatus,
    pub permit_number: Option<String>,
    pub pre_approval: Option<ReviewStamp>,
    pub approval: Option<ReviewStamp>,
    pub created_at: String,
    pub updated_at: String,
}

/// Calendar-day key used by the per-day serial counter, `DDMMYYYY`.
#[must_use]
pub fn day_key(at: DateTime<Utc>) -> String {
    at.format("%d%m%Y").to_string()
}

/// Formats a permit number from the approval instant and the daily serial,
/// e.g. `BHS-06082026-143059-007`.
#[must_use]
pub fn format_permit_number(at: DateTime<Utc>, serial: i32) -> String {
    format!(
        "{}-{}-{}-{:03}",
        PERMIT_NUMBER_PREFIX,
        at.format("%d%m%Y"),
        at.format("%H%M%S"),
        serial
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_legal_transitions() {
        assert_eq!(
            PermitStatus::Pending.transition(ReviewEvent::PreApprove),
            Some(PermitStatus::InProgress)
        );
        assert_eq!(
            PermitStatus::Pending.transition(ReviewEvent::PreReject),
            Some(PermitStatus::Rejected)
        );
        assert_eq!(
            PermitStatus::InProgress.transition(ReviewEvent::Approve),
            Some(PermitStatus::Approved)
        );
        assert_eq!(
            PermitStatus::InProgress.transition(ReviewEvent::Reject),
            Some(PermitStatus::Rejected)
        );
    }

    #[test]
    fn test_illegal_transitions() {
        // A permit already past pre-approval cannot be re-stamped.
        assert_eq!(PermitStatus::InProgress.transition(ReviewEvent::PreApprove), None);
        assert_eq!(PermitStatus::InProgress.transition(ReviewEvent::PreReject), None);

        // Terminal states accept nothing.
        for terminal in [PermitStatus::Approved, PermitStatus::Rejected] {
            for event in [
                ReviewEvent::PreApprove,
                ReviewEvent::PreReject,
                ReviewEvent::Approve,
                ReviewEvent::Reject,
            ] {
                assert_eq!(terminal.transition(event), None);
            }
        }

        // Final approval requires pre-approval first.
        assert_eq!(PermitStatus::Pending.transition(ReviewEvent::Approve), None);
    }

    #[test]
    fn test_permit_number_format() {
        let at = Utc.with_ymd_and_hms(2026, 8, 6, 14, 30, 59).unwrap();
        assert_eq!(format_permit_number(at, 7), "BHS-06082026-143059-007");
        assert_eq!(format_permit_number(at, 123), "BHS-06082026-143059-123");
        assert_eq!(day_key(at), "06082026");
    }
}
