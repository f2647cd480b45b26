use super::next_schedule;
use crate::shared::usecase::UseCase;
use anniv_scheduler_domain::{
    ReminderChannel, ReminderRule, ReminderRuleWithSlots, ReminderSlot, ScheduleError, SlotConfig,
    ID,
};
use anniv_scheduler_infra::AnnivContext;

/// Subscribes a user to the reminders of an anniversary
#[derive(Debug)]
pub struct CreateReminderRuleUseCase {
    pub anniversary_id: ID,
    pub user_id: ID,
    pub channels: Vec<ReminderChannel>,
    pub slots: Vec<SlotConfig>,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    AnniversaryNotFound(ID),
    RuleAlreadyExists,
    InvalidSchedule(ScheduleError),
    StorageError,
}

#[async_trait::async_trait]
impl UseCase for CreateReminderRuleUseCase {
    type Response = ReminderRuleWithSlots;

    type Errors = UseCaseError;

    async fn execute(&mut self, ctx: &AnnivContext) -> Result<Self::Response, Self::Errors> {
        let anniversary = ctx
            .repos
            .anniversaries
            .find(&self.anniversary_id)
            .await
            .map_err(|_| UseCaseError::StorageError)?
            .ok_or_else(|| UseCaseError::AnniversaryNotFound(self.anniversary_id.clone()))?;

        let existing = ctx
            .repos
            .reminder_rules
            .find_by_anniversary_and_user(&self.anniversary_id, &self.user_id)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        if existing.is_some() {
            return Err(UseCaseError::RuleAlreadyExists);
        }

        let now = ctx.sys.get_timestamp_millis();
        let rule = ReminderRule::new(
            self.anniversary_id.clone(),
            self.user_id.clone(),
            self.channels.clone(),
            now,
        );
        let slots = SlotConfig::dedup(self.slots.clone())
            .into_iter()
            .map(|config| {
                next_schedule(ctx, &anniversary, config, now)
                    .map(|schedule| ReminderSlot::new(rule.id.clone(), config, schedule))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(UseCaseError::InvalidSchedule)?;

        ctx.repos
            .reminder_rules
            .insert(&rule)
            .await
            .map_err(|_| UseCaseError::StorageError)?;
        for slot in &slots {
            ctx.repos
                .reminder_slots
                .insert(slot)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
        }

        Ok(ReminderRuleWithSlots { rule, slots })
    }
}
