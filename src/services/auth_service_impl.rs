//! `SeaORM`-backed implementation of the session authority.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::task;
use tracing::warn;

use crate::config::SecurityConfig;
use crate::db::Store;
use crate::db::repositories::account::{generate_token, hash_password, sha256_hex, verify_password};
use crate::models::account::{Account, AccountRef, AccountStatus, SessionMeta};
use crate::services::auth_service::{
    AuthError, AuthService, CredentialField, ResetTokenSink, SessionCheck,
};

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
    reset_sink: Arc<dyn ResetTokenSink>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, security: SecurityConfig, reset_sink: Arc<dyn ResetTokenSink>) -> Self {
        Self {
            store,
            security,
            reset_sink,
        }
    }

    async fn hash_with_config(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_string();
        let config = self.security.clone();
        let hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task panicked: {e}")))??;
        Ok(hash)
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let Some((account, stored_hash)) = self.store.account_credentials_by_email(email).await?
        else {
            return Err(AuthError::InvalidCredentials {
                field: CredentialField::Email,
            });
        };

        let is_valid = verify_password(password, &stored_hash).await?;
        if !is_valid {
            return Err(AuthError::InvalidCredentials {
                field: CredentialField::Password,
            });
        }

        // Deactivated accounts are refused the same way as a bad password so
        // the response does not reveal the account's existence.
        if account.status == AccountStatus::Inactive {
            return Err(AuthError::InvalidCredentials {
                field: CredentialField::Password,
            });
        }

        Ok(account)
    }

    async fn bind_session(
        &self,
        account: &AccountRef,
        session_id: &str,
        meta: &SessionMeta,
    ) -> Result<(), AuthError> {
        self.store
            .record_login(account.role, account.id, session_id, meta)
            .await?;
        Ok(())
    }

    async fn validate_session(&self, account: &AccountRef, session_id: &str) -> SessionCheck {
        let loaded = self.store.find_account_by_id(account.role, account.id).await;

        match loaded {
            Err(e) => {
                // Availability over strictness: a transient storage failure
                // must not sign every active user out.
                warn!(error = %e, "Session check hit a storage error; failing open");
                SessionCheck::FailOpen
            }
            Ok(None) => SessionCheck::Gone,
            Ok(Some(acct)) => match acct.active_session_id.as_deref() {
                Some(active) if active != session_id => SessionCheck::Revoked,
                _ => SessionCheck::Authorized(Box::new(acct)),
            },
        }
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let Some(account) = self.store.find_account_by_email(email).await? else {
            // Indistinguishable from the success path; the HTTP layer returns
            // the same generic message either way.
            return Ok(());
        };

        let raw_token = generate_token();
        let token_hash = sha256_hex(&raw_token);
        let expires = (Utc::now() + Duration::minutes(self.security.reset_token_ttl_minutes))
            .to_rfc3339();

        self.store
            .set_reset_token(account.role, account.id, &token_hash, &expires)
            .await?;

        self.reset_sink.deliver(&account.email, &raw_token);
        Ok(())
    }

    async fn complete_password_reset(
        &self,
        raw_token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.len() < 8 {
            return Err(AuthError::Validation(
                "New password must be at least 8 characters".to_string(),
            ));
        }

        let token_hash = sha256_hex(raw_token);

        let Some((account, expires)) = self.store.find_account_by_reset_token(&token_hash).await?
        else {
            return Err(AuthError::InvalidOrExpiredToken);
        };

        let still_valid = DateTime::parse_from_rfc3339(&expires)
            .map(|exp| exp.with_timezone(&Utc) > Utc::now())
            .unwrap_or(false);
        if !still_valid {
            return Err(AuthError::InvalidOrExpiredToken);
        }

        let new_hash = self.hash_with_config(new_password).await?;

        // Also nulls the token fields, making the token single-use.
        self.store
            .update_account_password(account.role, account.id, &new_hash)
            .await?;

        Ok(())
    }

    async fn change_password(
        &self,
        account: &AccountRef,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.len() < 8 {
            return Err(AuthError::Validation(
                "New password must be at least 8 characters".to_string(),
            ));
        }

        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let stored_hash = self
            .store
            .account_password_hash(account.role, account.id)
            .await?
            .ok_or(AuthError::NotAuthenticated)?;

        let is_valid = verify_password(current_password, &stored_hash).await?;
        if !is_valid {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        let new_hash = self.hash_with_config(new_password).await?;
        self.store
            .update_account_password(account.role, account.id, &new_hash)
            .await?;

        Ok(())
    }
}
