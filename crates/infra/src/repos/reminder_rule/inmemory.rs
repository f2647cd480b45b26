use super::IReminderRuleRepo;
use crate::repos::shared::inmemory_repo::*;
use anniv_scheduler_domain::{ReminderRule, ID};

pub struct InMemoryReminderRuleRepo {
    rules: std::sync::Mutex<Vec<ReminderRule>>,
}

impl InMemoryReminderRuleRepo {
    pub fn new() -> Self {
        Self {
            rules: std::sync::Mutex::new(vec![]),
        }
    }

    /// Slots are only claimable while their rule exists and is enabled
    pub(crate) fn is_enabled(&self, rule_id: &ID) -> bool {
        find(rule_id, &self.rules).map_or(false, |rule| rule.enabled)
    }
}

#[async_trait::async_trait]
impl IReminderRuleRepo for InMemoryReminderRuleRepo {
    async fn insert(&self, rule: &ReminderRule) -> anyhow::Result<()> {
        let duplicate = !find_by(&self.rules, |r| {
            r.anniversary_id == rule.anniversary_id && r.user_id == rule.user_id
        })
        .is_empty();
        if duplicate {
            anyhow::bail!(
                "User {} already has a reminder rule for anniversary {}",
                rule.user_id,
                rule.anniversary_id
            );
        }
        insert(rule, &self.rules);
        Ok(())
    }

    async fn save(&self, rule: &ReminderRule) -> anyhow::Result<()> {
        save(rule, &self.rules);
        Ok(())
    }

    async fn find(&self, rule_id: &ID) -> anyhow::Result<Option<ReminderRule>> {
        Ok(find(rule_id, &self.rules))
    }

    async fn find_many(&self, rule_ids: &[ID]) -> anyhow::Result<Vec<ReminderRule>> {
        Ok(find_many(rule_ids, &self.rules))
    }

    async fn find_by_anniversary(&self, anniversary_id: &ID) -> anyhow::Result<Vec<ReminderRule>> {
        Ok(find_by(&self.rules, |r| r.anniversary_id == *anniversary_id))
    }

    async fn find_by_anniversary_and_user(
        &self,
        anniversary_id: &ID,
        user_id: &ID,
    ) -> anyhow::Result<Option<ReminderRule>> {
        let mut rules = find_by(&self.rules, |r| {
            r.anniversary_id == *anniversary_id && r.user_id == *user_id
        });
        if rules.is_empty() {
            return Ok(None);
        }
        Ok(Some(rules.remove(0)))
    }

    async fn delete(&self, rule_id: &ID) -> anyhow::Result<Option<ReminderRule>> {
        Ok(delete(rule_id, &self.rules))
    }
}
