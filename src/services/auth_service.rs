//! Domain service for authentication and session integrity.
//!
//! Each account has at most one authoritative session; a newer login
//! supersedes the previous one, which is refused on its next use.

use thiserror::Error;

use crate::models::account::{Account, AccountRef, SessionMeta};

/// Which credential field failed. Surfaced to the client in the login error
/// payload; a deliberate information-leak trade-off carried over from the
/// original behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Email,
    Password,
}

impl CredentialField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Password => "password",
        }
    }
}

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials { field: CredentialField },

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Outcome of the per-request session check.
#[derive(Debug)]
pub enum SessionCheck {
    /// Session id matches the account's active session (or the account has
    /// none recorded).
    Authorized(Box<Account>),

    /// Storage failed mid-check. Deliberately treated as authorized so a
    /// transient outage does not take every signed-in user down with it.
    FailOpen,

    /// The account record no longer exists.
    Gone,

    /// A newer login superseded this session.
    Revoked,
}

/// Delivery seam for raw password-reset tokens. Mail transport lives outside
/// this crate; the default sink only logs that a token was issued.
pub trait ResetTokenSink: Send + Sync {
    fn deliver(&self, email: &str, raw_token: &str);
}

/// Logs the issuance, never the token.
pub struct LogOnlySink;

impl ResetTokenSink for LogOnlySink {
    fn deliver(&self, email: &str, _raw_token: &str) {
        tracing::info!(email, "Password reset token issued");
    }
}

/// Domain service trait for the session authority.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and returns the matched account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when no account matches the
    /// email, the password comparison fails, or the account is inactive.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Account, AuthError>;

    /// Records a successful login: shifts the login timestamps and binds
    /// `session_id` as the account's sole active session, superseding any
    /// previous one.
    async fn bind_session(
        &self,
        account: &AccountRef,
        session_id: &str,
        meta: &SessionMeta,
    ) -> Result<(), AuthError>;

    /// Per-request check that the presented session is still the authoritative
    /// one for the account. Storage errors fail open; see [`SessionCheck::FailOpen`].
    async fn validate_session(&self, account: &AccountRef, session_id: &str) -> SessionCheck;

    /// Issues a reset token for the account behind `email`, if any. The caller
    /// must respond identically whether or not the email exists.
    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError>;

    /// Consumes a reset token. Single-use: the stored token fields are nulled
    /// on success.
    async fn complete_password_reset(
        &self,
        raw_token: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    /// Changes a password after verifying the current one.
    async fn change_password(
        &self,
        account: &AccountRef,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}
