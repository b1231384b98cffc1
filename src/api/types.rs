use serde::Serialize;

use crate::db::Notification;
use crate::models::account::Account;
use crate::models::permit::{Permit, ReviewStamp};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable error tag (e.g. `SESSION_REVOKED`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Failing credential field on login errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
            field: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            code: None,
            field: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountDto {
    pub id: i32,
    pub role: String,
    pub email: String,
    pub display_name: String,
    pub status: String,
    pub last_login: Option<String>,
    pub prev_login: Option<String>,
    pub created_at: String,
}

impl From<Account> for AccountDto {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            role: account.role.as_str().to_string(),
            email: account.email,
            display_name: account.display_name,
            status: account.status.as_str().to_string(),
            last_login: account.last_login,
            prev_login: account.prev_login,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionDto {
    pub id: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: AccountDto,
    pub session: SessionDto,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: AccountDto,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewStampDto {
    pub actor_id: i32,
    pub actor_name: String,
    pub at: String,
    pub comments: Option<String>,
}

impl From<ReviewStamp> for ReviewStampDto {
    fn from(stamp: ReviewStamp) -> Self {
        Self {
            actor_id: stamp.actor_id,
            actor_name: stamp.actor_name,
            at: stamp.at,
            comments: stamp.comments,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PermitDto {
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
    pub status: String,
    pub permit_number: Option<String>,
    pub pre_approval: Option<ReviewStampDto>,
    pub approval: Option<ReviewStampDto>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Permit> for PermitDto {
    fn from(permit: Permit) -> Self {
        Self {
            id: permit.id,
            requester_id: permit.requester_id,
            title: permit.title,
            description: permit.description,
            terminal: permit.terminal,
            window_start: permit.window_start,
            window_end: permit.window_end,
            risk_flags: permit.risk_flags,
            risk_reasons: permit.risk_reasons,
            attachments: permit.attachments,
            status: permit.status.as_str().to_string(),
            permit_number: permit.permit_number,
            pre_approval: permit.pre_approval.map(ReviewStampDto::from),
            approval: permit.approval.map(ReviewStampDto::from),
            created_at: permit.created_at,
            updated_at: permit.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationDto {
    pub id: i32,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}

impl From<Notification> for NotificationDto {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            kind: n.kind,
            title: n.title,
            message: n.message,
            read: n.read,
            metadata: n.metadata,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread: u64,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: String,
}
