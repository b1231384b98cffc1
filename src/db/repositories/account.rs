use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use sha2::{Digest, Sha256};
use tokio::task;

use crate::config::SecurityConfig;
use crate::entities::{admins, approvers, requesters};
use crate::models::account::{Account, AccountStatus, Role, SessionMeta};

impl From<admins::Model> for Account {
    fn from(m: admins::Model) -> Self {
        Self {
            id: m.id,
            role: Role::Admin,
            email: m.email,
            display_name: m.display_name,
            status: AccountStatus::parse(&m.status).unwrap_or(AccountStatus::Active),
            last_login: m.last_login,
            prev_login: m.prev_login,
            active_session_id: m.active_session_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<approvers::Model> for Account {
    fn from(m: approvers::Model) -> Self {
        let role = if m.subrole == "approver" {
            Role::Approver
        } else {
            Role::PreApprover
        };
        Self {
            id: m.id,
            role,
            email: m.email,
            display_name: m.display_name,
            status: AccountStatus::parse(&m.status).unwrap_or(AccountStatus::Active),
            last_login: m.last_login,
            prev_login: m.prev_login,
            active_session_id: m.active_session_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<requesters::Model> for Account {
    fn from(m: requesters::Model) -> Self {
        Self {
            id: m.id,
            role: Role::Requester,
            email: m.email,
            display_name: m.display_name,
            status: AccountStatus::parse(&m.status).unwrap_or(AccountStatus::Active),
            last_login: m.last_login,
            prev_login: m.prev_login,
            active_session_id: m.active_session_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Dispatches a block over the collection backing `$role`, with the entity
/// module bound to `$m`. All three collections share the column set the
/// block may touch (approvers additionally carry `subrole`).
macro_rules! for_collection {
    ($role:expr, $m:ident => $body:block) => {
        match $role {
            Role::Admin => {
                use crate::entities::admins as $m;
                $body
            }
            Role::PreApprover | Role::Approver => {
                use crate::entities::approvers as $m;
                $body
            }
            Role::Requester => {
                use crate::entities::requesters as $m;
                $body
            }
        }
    };
}

/// Unified repository over the three account collections. Lookups by email
/// and by reset token probe the collections in a fixed priority order:
/// admins, then approvers, then requesters; first match wins.
pub struct AccountRepository {
    conn: DatabaseConnection,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .credentials_by_email(email)
            .await?
            .map(|(account, _)| account))
    }

    /// Priority-ordered lookup returning the account together with its
    /// password hash. The hash stays inside the service layer.
    pub async fn credentials_by_email(&self, email: &str) -> Result<Option<(Account, String)>> {
        let email = normalize_email(email);

        if let Some(m) = admins::Entity::find()
            .filter(admins::Column::Email.eq(&email))
            .one(&self.conn)
            .await
            .context("Failed to query admins by email")?
        {
            let hash = m.password_hash.clone();
            return Ok(Some((Account::from(m), hash)));
        }

        if let Some(m) = approvers::Entity::find()
            .filter(approvers::Column::Email.eq(&email))
            .one(&self.conn)
            .await
            .context("Failed to query approvers by email")?
        {
            let hash = m.password_hash.clone();
            return Ok(Some((Account::from(m), hash)));
        }

        if let Some(m) = requesters::Entity::find()
            .filter(requesters::Column::Email.eq(&email))
            .one(&self.conn)
            .await
            .context("Failed to query requesters by email")?
        {
            let hash = m.password_hash.clone();
            return Ok(Some((Account::from(m), hash)));
        }

        Ok(None)
    }

    pub async fn find_by_id(&self, role: Role, id: i32) -> Result<Option<Account>> {
        for_collection!(role, m => {
            let found = m::Entity::find_by_id(id)
                .one(&self.conn)
                .await
                .context("Failed to query account by id")?;
            Ok(found.map(Account::from))
        })
    }

    pub async fn password_hash(&self, role: Role, id: i32) -> Result<Option<String>> {
        for_collection!(role, m => {
            let found = m::Entity::find_by_id(id)
                .one(&self.conn)
                .await
                .context("Failed to query account credential")?;
            Ok(found.map(|m| m.password_hash))
        })
    }

    pub async fn email_in_use(&self, email: &str) -> Result<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    pub async fn create(
        &self,
        role: Role,
        email: &str,
        display_name: &str,
        password_hash: &str,
    ) -> Result<Account> {
        let email = normalize_email(email);
        let now = chrono::Utc::now().to_rfc3339();

        match role {
            Role::Admin => {
                let active = admins::ActiveModel {
                    email: Set(email),
                    display_name: Set(display_name.to_string()),
                    password_hash: Set(password_hash.to_string()),
                    status: Set(AccountStatus::Active.as_str().to_string()),
                    created_at: Set(now.clone()),
                    updated_at: Set(now),
                    ..Default::default()
                };
                Ok(Account::from(active.insert(&self.conn).await?))
            }
            Role::PreApprover | Role::Approver => {
                let active = approvers::ActiveModel {
                    email: Set(email),
                    display_name: Set(display_name.to_string()),
                    subrole: Set(role.as_str().to_string()),
                    password_hash: Set(password_hash.to_string()),
                    status: Set(AccountStatus::Active.as_str().to_string()),
                    created_at: Set(now.clone()),
                    updated_at: Set(now),
                    ..Default::default()
                };
                Ok(Account::from(active.insert(&self.conn).await?))
            }
            Role::Requester => {
                let active = requesters::ActiveModel {
                    email: Set(email),
                    display_name: Set(display_name.to_string()),
                    password_hash: Set(password_hash.to_string()),
                    status: Set(AccountStatus::Active.as_str().to_string()),
                    created_at: Set(now.clone()),
                    updated_at: Set(now),
                    ..Default::default()
                };
                Ok(Account::from(active.insert(&self.conn).await?))
            }
        }
    }

    pub async fn list_all(&self) -> Result<Vec<Account>> {
        let mut out: Vec<Account> = Vec::new();

        out.extend(
            admins::Entity::find()
                .all(&self.conn)
                .await
                .context("Failed to list admins")?
                .into_iter()
                .map(Account::from),
        );
        out.extend(
            approvers::Entity::find()
                .all(&self.conn)
                .await
                .context("Failed to list approvers")?
                .into_iter()
                .map(Account::from),
        );
        out.extend(
            requesters::Entity::find()
                .all(&self.conn)
                .await
                .context("Failed to list requesters")?
                .into_iter()
                .map(Account::from),
        );

        Ok(out)
    }

    /// Successful authentication: shift `last_login` into `prev_login`, stamp
    /// the new login time, and overwrite `active_session_id` with the freshly
    /// minted session. The superseded session is not touched; it is refused by
    /// comparison on its next use.
    pub async fn record_login(
        &self,
        role: Role,
        id: i32,
        session_id: &str,
        meta: &SessionMeta,
    ) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        for_collection!(role, m => {
            let model = m::Entity::find_by_id(id)
                .one(&self.conn)
                .await
                .context("Failed to query account for login")?
                .ok_or_else(|| anyhow::anyhow!("Account not found: {role}/{id}"))?;

            let previous = model.last_login.clone();
            let mut active: m::ActiveModel = model.into();
            active.prev_login = Set(previous);
            active.last_login = Set(Some(now.clone()));
            active.active_session_id = Set(Some(session_id.to_string()));
            active.session_created_at = Set(Some(now.clone()));
            active.session_user_agent = Set(meta.user_agent.clone());
            active.session_ip = Set(meta.ip.clone());
            active.updated_at = Set(now);
            active.update(&self.conn).await?;
            Ok(())
        })
    }

    /// Replaces the credential and clears any outstanding reset token.
    pub async fn update_password(&self, role: Role, id: i32, new_hash: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        for_collection!(role, m => {
            let model = m::Entity::find_by_id(id)
                .one(&self.conn)
                .await
                .context("Failed to query account for password update")?
                .ok_or_else(|| anyhow::anyhow!("Account not found: {role}/{id}"))?;

            let mut active: m::ActiveModel = model.into();
            active.password_hash = Set(new_hash.to_string());
            active.reset_token_hash = Set(None);
            active.reset_expires = Set(None);
            active.updated_at = Set(now);
            active.update(&self.conn).await?;
            Ok(())
        })
    }

    pub async fn set_reset_token(
        &self,
        role: Role,
        id: i32,
        token_hash: &str,
        expires: &str,
    ) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();

        for_collection!(role, m => {
            let model = m::Entity::find_by_id(id)
                .one(&self.conn)
                .await
                .context("Failed to query account for reset token")?
                .ok_or_else(|| anyhow::anyhow!("Account not found: {role}/{id}"))?;

            let mut active: m::ActiveModel = model.into();
            active.reset_token_hash = Set(Some(token_hash.to_string()));
            active.reset_expires = Set(Some(expires.to_string()));
            active.updated_at = Set(now);
            active.update(&self.conn).await?;
            Ok(())
        })
    }

    /// Looks up the account holding an outstanding reset token, returning the
    /// stored expiry alongside it. Same priority order as the email lookup.
    pub async fn find_by_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<(Account, String)>> {
        if let Some(m) = admins::Entity::find()
            .filter(admins::Column::ResetTokenHash.eq(token_hash))
            .one(&self.conn)
            .await
            .context("Failed to query admins by reset token")?
        {
            let expires = m.reset_expires.clone().unwrap_or_default();
            return Ok(Some((Account::from(m), expires)));
        }

        if let Some(m) = approvers::Entity::find()
            .filter(approvers::Column::ResetTokenHash.eq(token_hash))
            .one(&self.conn)
            .await
            .context("Failed to query approvers by reset token")?
        {
            let expires = m.reset_expires.clone().unwrap_or_default();
            return Ok(Some((Account::from(m), expires)));
        }

        if let Some(m) = requesters::Entity::find()
            .filter(requesters::Column::ResetTokenHash.eq(token_hash))
            .one(&self.conn)
            .await
            .context("Failed to query requesters by reset token")?
        {
            let expires = m.reset_expires.clone().unwrap_or_default();
            return Ok(Some((Account::from(m), expires)));
        }

        Ok(None)
    }

    pub async fn set_status(&self, role: Role, id: i32, status: AccountStatus) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();

        for_collection!(role, m => {
            let Some(model) = m::Entity::find_by_id(id)
                .one(&self.conn)
                .await
                .context("Failed to query account for status change")?
            else {
                return Ok(false);
            };

            let mut active: m::ActiveModel = model.into();
            active.status = Set(status.as_str().to_string());
            active.updated_at = Set(now);
            active.update(&self.conn).await?;
            Ok(true)
        })
    }
}

#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a password using Argon2id with optional custom params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string.
/// Note: runs in `spawn_blocking` because Argon2 is CPU-intensive and would
/// stall the async runtime if run inline.
pub async fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();

    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&stored_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        let argon2 = Argon2::default();
        Ok::<bool, anyhow::Error>(
            argon2
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")?
}

/// Generate a random opaque token (64 character hex string).
#[must_use]
pub fn generate_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// SHA-256 digest as lowercase hex; used to store reset tokens without
/// keeping the raw value.
#[must_use]
pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ops@Example.COM "), "ops@example.com");
    }

    #[test]
    fn test_sha256_hex_is_stable() {
        let a = sha256_hex("token");
        let b = sha256_hex("token");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, sha256_hex("other"));
    }

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }
}
