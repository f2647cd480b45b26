use super::next_schedule;
use crate::shared::usecase::UseCase;
use anniv_scheduler_domain::{
    ReminderChannel, ReminderRuleWithSlots, ReminderSlot, ScheduleError, SlotConfig, ID,
};
use anniv_scheduler_infra::AnnivContext;

/// Changes the channels and/or the slots of a reminder rule.
///
/// Slots whose (offset, time) survive the change are kept as they are,
/// including their schedule. Removed slots are deleted and new ones are
/// scheduled from now.
#[derive(Debug)]
pub struct UpdateReminderRuleUseCase {
    pub rule_id: ID,
    pub channels: Option<Vec<ReminderChannel>>,
    pub slots: Option<Vec<SlotConfig>>,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    RuleNotFound(ID),
    AnniversaryNotFound(ID),
    InvalidSchedule(ScheduleError),
    StorageError,
}

#[async_trait::async_trait]
impl UseCase for UpdateReminderRuleUseCase {
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
        let now = ctx.sys.get_timestamp_millis();

        if let Some(configs) = &self.slots {
            let anniversary = ctx
                .repos
                .anniversaries
                .find(&rule.anniversary_id)
                .await
                .map_err(|_| UseCaseError::StorageError)?
                .ok_or_else(|| UseCaseError::AnniversaryNotFound(rule.anniversary_id.clone()))?;
            let wanted = SlotConfig::dedup(configs.clone());
            let existing = ctx
                .repos
                .reminder_slots
                .find_by_rule(&rule.id)
                .await
                .map_err(|_| UseCaseError::StorageError)?;

            let added = wanted
                .iter()
                .filter(|config| !existing.iter().any(|slot| slot.config() == **config))
                .map(|config| {
                    next_schedule(ctx, &anniversary, *config, now)
                        .map(|schedule| ReminderSlot::new(rule.id.clone(), *config, schedule))
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(UseCaseError::InvalidSchedule)?;

            for slot in existing
                .iter()
                .filter(|slot| !wanted.contains(&slot.config()))
            {
                ctx.repos
                    .reminder_slots
                    .delete(&slot.id)
                    .await
                    .map_err(|_| UseCaseError::StorageError)?;
            }
            for slot in &added {
                ctx.repos
                    .reminder_slots
                    .insert(slot)
                    .await
                    .map_err(|_| UseCaseError::StorageError)?;
            }
        }

        if let Some(channels) = &self.channels {
            rule.set_channels(channels.clone());
        }
        rule.updated = now;
        ctx.repos
            .reminder_rules
            .save(&rule)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let slots = ctx
            .repos
            .reminder_slots
            .find_by_rule(&rule.id)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok(ReminderRuleWithSlots { rule, slots })
    }
}
