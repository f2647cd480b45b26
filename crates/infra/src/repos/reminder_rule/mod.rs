mod inmemory;
mod postgres;

use anniv_scheduler_domain::{ReminderRule, ID};
pub use inmemory::InMemoryReminderRuleRepo;
pub use postgres::PostgresReminderRuleRepo;

#[async_trait::async_trait]
pub trait IReminderRuleRepo: Send + Sync {
    async fn insert(&self, rule: &ReminderRule) -> anyhow::Result<()>;
    async fn save(&self, rule: &ReminderRule) -> anyhow::Result<()>;
    async fn find(&self, rule_id: &ID) -> anyhow::Result<Option<ReminderRule>>;
    async fn find_many(&self, rule_ids: &[ID]) -> anyhow::Result<Vec<ReminderRule>>;
    async fn find_by_anniversary(&self, anniversary_id: &ID) -> anyhow::Result<Vec<ReminderRule>>;
    async fn find_by_anniversary_and_user(
        &self,
        anniversary_id: &ID,
        user_id: &ID,
    ) -> anyhow::Result<Option<ReminderRule>>;
    async fn delete(&self, rule_id: &ID) -> anyhow::Result<Option<ReminderRule>>;
}
