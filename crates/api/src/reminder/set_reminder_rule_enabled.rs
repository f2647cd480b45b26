use super::next_schedule;
use crate::shared::usecase::UseCase;
use anniv_scheduler_domain::{ReminderRuleWithSlots, ScheduleError, ID};
use anniv_scheduler_infra::AnnivContext;

/// Opts a user out of, or back into, the reminders of a rule.
///
/// A disabled rule keeps its slots but none of them is ever claimed. On
/// re-enabling every slot is scheduled again from now, so a schedule that
/// went by while the rule was disabled does not fire late.
#[derive(Debug)]
pub struct SetReminderRuleEnabledUseCase {
    pub rule_id: ID,
    pub enabled: bool,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    RuleNotFound(ID),
    AnniversaryNotFound(ID),
    InvalidSchedule(ScheduleError),
    StorageError,
}

#[async_trait::async_trait]
impl UseCase for SetReminderRuleEnabledUseCase {
    type Response = ReminderRuleWithSlots;

    type Errors = UseCaseError;

    async fn execute(&mut self, ctx: &AnnivContext) -> Result<Self::Response, Self::Errors> {
        let mut rule = ctx
            .repos
            .reminder_rules
            .find(&self.rule_id)
            .await
            .map_err(|_| UseCaseError::StorageError)?
            .ok_or_else(|| UseCaseError::RuleNotFound(self.rule_id.clone()))?;
        let mut slots = ctx
            .repos
            .reminder_slots
            .find_by_rule(&rule.id)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        if rule.enabled == self.enabled {
            return Ok(ReminderRuleWithSlots { rule, slots });
        }

        let now = ctx.sys.get_timestamp_millis();
        // Slots are rescheduled before the rule becomes claimable again
        if self.enabled {
            let anniversary = ctx
                .repos
                .anniversaries
                .find(&rule.anniversary_id)
                .await
                .map_err(|_| UseCaseError::StorageError)?
                .ok_or_else(|| UseCaseError::AnniversaryNotFound(rule.anniversary_id.clone()))?;
            for slot in slots.iter_mut() {
                let schedule = next_schedule(ctx, &anniversary, slot.config(), now)
                    .map_err(UseCaseError::InvalidSchedule)?;
                slot.apply(schedule);
                ctx.repos
                    .reminder_slots
                    .save(slot)
                    .await
                    .map_err(|_| UseCaseError::StorageError)?;
            }
        }

        rule.enabled = self.enabled;
        rule.updated = now;
        ctx.repos
            .reminder_rules
            .save(&rule)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok(ReminderRuleWithSlots { rule, slots })
    }
}
