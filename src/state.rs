use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, LogOnlySink, MinimalPdfRenderer, NotificationService, PermitService,
    SeaOrmAuthService, SeaOrmPermitService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub permit_service: Arc<dyn PermitService>,

    pub notification_service: Arc<NotificationService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
            Arc::new(LogOnlySink),
        )) as Arc<dyn AuthService>;

        let notification_service = Arc::new(NotificationService::new(store.clone()));

        let permit_service = Arc::new(SeaOrmPermitService::new(
            store.clone(),
            notification_service.clone(),
            Arc::new(MinimalPdfRenderer),
        )) as Arc<dyn PermitService>;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            auth_service,
            permit_service,
            notification_service,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
