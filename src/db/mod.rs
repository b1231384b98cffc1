use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::notification::Notification;
pub use repositories::permit::{NewPermit, StampInput};

use crate::models::account::{Account, AccountStatus, Role, SessionMeta};
use crate::models::permit::{Permit, PermitStatus};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") && !db_url.contains("::memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn account_repo(&self) -> repositories::account::AccountRepository {
        repositories::account::AccountRepository::new(self.conn.clone())
    }

    fn permit_repo(&self) -> repositories::permit::PermitRepository {
        repositories::permit::PermitRepository::new(self.conn.clone())
    }

    fn notification_repo(&self) -> repositories::notification::NotificationRepository {
        repositories::notification::NotificationRepository::new(self.conn.clone())
    }

    fn counter_repo(&self) -> repositories::counter::CounterRepository {
        repositories::counter::CounterRepository::new(self.conn.clone())
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    pub async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.account_repo().find_by_email(email).await
    }

    pub async fn account_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<(Account, String)>> {
        self.account_repo().credentials_by_email(email).await
    }

    pub async fn find_account_by_id(&self, role: Role, id: i32) -> Result<Option<Account>> {
        self.account_repo().find_by_id(role, id).await
    }

    pub async fn account_password_hash(&self, role: Role, id: i32) -> Result<Option<String>> {
        self.account_repo().password_hash(role, id).await
    }

    pub async fn account_email_in_use(&self, email: &str) -> Result<bool> {
        self.account_repo().email_in_use(email).await
    }

    pub async fn create_account(
        &self,
        role: Role,
        email: &str,
        display_name: &str,
        password_hash: &str,
    ) -> Result<Account> {
        self.account_repo()
            .create(role, email, display_name, password_hash)
            .await
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.account_repo().list_all().await
    }

    pub async fn record_login(
        &self,
        role: Role,
        id: i32,
        session_id: &str,
        meta: &SessionMeta,
    ) -> Result<()> {
        self.account_repo()
            .record_login(role, id, session_id, meta)
            .await
    }

    pub async fn update_account_password(
        &self,
        role: Role,
        id: i32,
        new_hash: &str,
    ) -> Result<()> {
        self.account_repo().update_password(role, id, new_hash).await
    }

    pub async fn set_reset_token(
        &self,
        role: Role,
        id: i32,
        token_hash: &str,
        expires: &str,
    ) -> Result<()> {
        self.account_repo()
            .set_reset_token(role, id, token_hash, expires)
            .await
    }

    pub async fn find_account_by_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<(Account, String)>> {
        self.account_repo().find_by_reset_token(token_hash).await
    }

    pub async fn set_account_status(
        &self,
        role: Role,
        id: i32,
        status: AccountStatus,
    ) -> Result<bool> {
        self.account_repo().set_status(role, id, status).await
    }

    // ========================================================================
    // Permits
    // ========================================================================

    pub async fn create_permit(&self, requester_id: i32, input: &NewPermit) -> Result<Permit> {
        self.permit_repo().create(requester_id, input).await
    }

    pub async fn get_permit(&self, id: i32) -> Result<Option<Permit>> {
        self.permit_repo().get(id).await
    }

    pub async fn get_owned_permit(&self, id: i32, requester_id: i32) -> Result<Option<Permit>> {
        self.permit_repo().get_owned(id, requester_id).await
    }

    pub async fn list_permits_for_requester(&self, requester_id: i32) -> Result<Vec<Permit>> {
        self.permit_repo().list_for_requester(requester_id).await
    }

    pub async fn list_permits_by_status(&self, status: PermitStatus) -> Result<Vec<Permit>> {
        self.permit_repo().list_by_status(status).await
    }

    pub async fn record_pre_review(
        &self,
        id: i32,
        expected: PermitStatus,
        next: PermitStatus,
        stamp: &StampInput<'_>,
    ) -> Result<bool> {
        self.permit_repo()
            .record_pre_review(id, expected, next, stamp)
            .await
    }

    pub async fn record_final(
        &self,
        id: i32,
        expected: PermitStatus,
        next: PermitStatus,
        permit_number: Option<&str>,
        stamp: &StampInput<'_>,
    ) -> Result<bool> {
        self.permit_repo()
            .record_final(id, expected, next, permit_number, stamp)
            .await
    }

    pub async fn next_permit_serial(&self, day: &str) -> Result<i32> {
        self.counter_repo().next_serial(day).await
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    pub async fn create_notification(
        &self,
        user_id: i32,
        kind: &str,
        title: &str,
        message: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<i32> {
        self.notification_repo()
            .create(user_id, kind, title, message, metadata)
            .await
    }

    pub async fn list_notifications(&self, user_id: i32) -> Result<Vec<Notification>> {
        self.notification_repo().list_for_user(user_id).await
    }

    pub async fn unread_notification_count(&self, user_id: i32) -> Result<u64> {
        self.notification_repo().unread_count(user_id).await
    }

    pub async fn mark_notifications_read(&self, user_id: i32) -> Result<u64> {
        self.notification_repo().mark_all_read(user_id).await
    }
}
