mod anniversary;
mod reminder_rule;
mod reminder_slot;
mod shared;

use anniversary::{IAnniversaryRepo, InMemoryAnniversaryRepo, PostgresAnniversaryRepo};
use reminder_rule::{IReminderRuleRepo, InMemoryReminderRuleRepo, PostgresReminderRuleRepo};
use reminder_slot::{IReminderSlotRepo, InMemoryReminderSlotRepo, PostgresReminderSlotRepo};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;

pub use reminder_slot::DueSlotClaim;

#[derive(Clone)]
pub struct Repos {
    pub anniversaries: Arc<dyn IAnniversaryRepo>,
    pub reminder_rules: Arc<dyn IReminderRuleRepo>,
    pub reminder_slots: Arc<dyn IReminderSlotRepo>,
}

impl Repos {
    pub async fn create_postgres(connection_string: &str) -> anyhow::Result<Self> {
        info!("DB CHECKING CONNECTION ...");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;
        info!("DB CHECKING CONNECTION ... [done]");
        Ok(Self {
            anniversaries: Arc::new(PostgresAnniversaryRepo::new(pool.clone())),
            reminder_rules: Arc::new(PostgresReminderRuleRepo::new(pool.clone())),
            reminder_slots: Arc::new(PostgresReminderSlotRepo::new(pool)),
        })
    }

    pub fn create_inmemory() -> Self {
        let reminder_rules = Arc::new(InMemoryReminderRuleRepo::new());
        Self {
            anniversaries: Arc::new(InMemoryAnniversaryRepo::new()),
            reminder_slots: Arc::new(InMemoryReminderSlotRepo::new(reminder_rules.clone())),
            reminder_rules,
        }
    }
}
