mod config;
mod repos;
mod services;
mod system;

pub use config::Config;
pub use repos::{DueSlotClaim, Repos};
pub use services::*;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
pub use system::{ISys, ManualSys, RealSys};

#[derive(Clone)]
pub struct AnnivContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub notifier: Arc<dyn INotifier>,
}

struct ContextParams {
    pub postgres_connection_string: String,
}

impl AnnivContext {
    async fn create(params: ContextParams) -> Self {
        let repos = Repos::create_postgres(&params.postgres_connection_string)
            .await
            .expect("Postgres credentials must be set and valid");
        let config = Config::new();
        Self {
            repos,
            notifier: create_notifier(&config)
                .expect("Notification webhook settings must be valid"),
            config,
            sys: Arc::new(RealSys {}),
        }
    }

    /// Context backed by inmemory repositories, used by tests and local runs
    pub fn create_inmemory() -> Self {
        let config = Config::new();
        Self {
            repos: Repos::create_inmemory(),
            notifier: create_notifier(&config)
                .expect("Notification webhook settings must be valid"),
            config,
            sys: Arc::new(RealSys {}),
        }
    }
}

/// Dispatches are only logged when no webhook is configured. A configured
/// webhook that cannot be used is an error, never a silent fallback.
fn create_notifier(config: &Config) -> anyhow::Result<Arc<dyn INotifier>> {
    match &config.notification_webhook_url {
        Some(url) => Ok(Arc::new(WebhookNotifier::new(
            url,
            config.notification_webhook_key.clone(),
            config.notification_timeout,
        )?)),
        None => Ok(Arc::new(LogNotifier {})),
    }
}

/// Will setup the infrastructure context given the environment
pub async fn setup_context() -> AnnivContext {
    AnnivContext::create(ContextParams {
        postgres_connection_string: get_psql_connection_string(),
    })
    .await
}

fn get_psql_connection_string() -> String {
    const PSQL_CONNECTION_STRING: &str = "DATABASE_URL";

    std::env::var(PSQL_CONNECTION_STRING)
        .unwrap_or_else(|_| panic!("{} env var to be present.", PSQL_CONNECTION_STRING))
}

pub async fn run_migration() -> Result<(), MigrateError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&get_psql_connection_string())
        .await
        .expect("TO CONNECT TO POSTGRES");

    sqlx::migrate!().run(&pool).await
}
