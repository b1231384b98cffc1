use serde::{Deserialize, Serialize};

/// Role tag for an account. Requesters, approver-like reviewers and admins
/// live in separate collections; the role both gates routes and selects the
/// backing collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    PreApprover,
    Approver,
    Requester,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::PreApprover => "pre_approver",
            Self::Approver => "approver",
            Self::Requester => "requester",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "pre_approver" => Some(Self::PreApprover),
            "approver" => Some(Self::Approver),
            "requester" => Some(Self::Requester),
            _ => None,
        }
    }

    /// Both approver subroles share the approvers collection.
    #[must_use]
    pub const fn is_reviewer(self) -> bool {
        matches!(self, Self::PreApprover | Self::Approver)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login eligibility toggle managed by admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// Unified account view resolved from one of the three role collections.
/// The password hash never leaves the repository layer.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i32,
    pub role: Role,
    pub email: String,
    pub display_name: String,
    pub status: AccountStatus,
    pub last_login: Option<String>,
    pub prev_login: Option<String>,
    pub active_session_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Account {
    #[must_use]
    pub const fn account_ref(&self) -> AccountRef {
        AccountRef {
            id: self.id,
            role: self.role,
        }
    }
}

/// Minimal identity stored in the transport session and threaded through
/// request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    pub id: i32,
    pub role: Role,
}

/// Diagnostic metadata recorded next to the active session id. Informational
/// only; the revocation decision compares session ids and nothing else.
#[derive(Debug, Clone, Default)]
pub struct SessionMeta {
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Admin, Role::PreApprover, Role::Approver, Role::Requester] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn test_reviewer_roles() {
        assert!(Role::PreApprover.is_reviewer());
        assert!(Role::Approver.is_reviewer());
        assert!(!Role::Requester.is_reviewer());
        assert!(!Role::Admin.is_reviewer());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(AccountStatus::parse("active"), Some(AccountStatus::Active));
        assert_eq!(AccountStatus::parse("inactive"), Some(AccountStatus::Inactive));
        assert_eq!(AccountStatus::parse("disabled"), None);
    }
}
