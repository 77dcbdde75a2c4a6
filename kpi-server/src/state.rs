//! Application state shared by every handler

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use crate::config::Config;
use crate::db::{EvaluationStore, PgStore};
use crate::invitation::InvitationService;
use crate::live::{LiveConfig, LiveHub};
use crate::notification::Notifier;
use crate::workflow::EvaluationWorkflow;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    /// Per-user realtime connections
    pub live: LiveHub,
    pub workflow: EvaluationWorkflow,
    pub invitations: InvitationService,
    /// HMAC secret for bearer tokens
    pub jwt_secret: String,
}

impl AppState {
    /// Connect to PostgreSQL, run migrations and wire the services
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        let store: Arc<dyn EvaluationStore> = Arc::new(PgStore::new(pool));
        Ok(Self::with_store(
            store,
            config.live.clone(),
            config.jwt_secret.clone(),
        ))
    }

    pub fn with_store(
        store: Arc<dyn EvaluationStore>,
        live_config: LiveConfig,
        jwt_secret: String,
    ) -> Self {
        let live = LiveHub::new(live_config);
        let notifier = Notifier::new(store.clone(), live.clone());
        Self {
            workflow: EvaluationWorkflow::new(store.clone(), notifier.clone()),
            invitations: InvitationService::new(store, notifier),
            live,
            jwt_secret,
        }
    }
}
