use super::next_schedule;
use crate::shared::usecase::UseCase;
use anniv_scheduler_domain::{ReminderSlot, ScheduleError, ID};
use anniv_scheduler_infra::AnnivContext;

/// Reschedules every reminder slot of an anniversary after its anchor,
/// repeat pattern or timezone was edited
#[derive(Debug)]
pub struct SyncAnniversaryRemindersUseCase {
    pub anniversary_id: ID,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    AnniversaryNotFound(ID),
    InvalidSchedule(ScheduleError),
    StorageError,
}

#[async_trait::async_trait]
impl UseCase for SyncAnniversaryRemindersUseCase {
    type Response = Vec<ReminderSlot>;

    type Errors = UseCaseError;

    async fn execute(&mut self, ctx: &AnnivContext) -> Result<Self::Response, Self::Errors> {
        let anniversary = ctx
            .repos
            .anniversaries
            .find(&self.anniversary_id)
            .await
            .map_err(|_| UseCaseError::StorageError)?
            .ok_or_else(|| UseCaseError::AnniversaryNotFound(self.anniversary_id.clone()))?;
        let rule_ids = ctx
            .repos
            .reminder_rules
            .find_by_anniversary(&anniversary.id)
            .await
            .map_err(|_| UseCaseError::StorageError)?
            .into_iter()
            .map(|rule| rule.id)
            .collect::<Vec<_>>();
        let mut slots = ctx
            .repos
            .reminder_slots
            .find_by_rules(&rule_ids)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        let now = ctx.sys.get_timestamp_millis();
        for slot in slots.iter_mut() {
            let schedule = next_schedule(ctx, &anniversary, slot.config(), now)
                .map_err(UseCaseError::InvalidSchedule)?;
            slot.apply(schedule);
        }
        for slot in &slots {
            ctx.repos
                .reminder_slots
                .save(slot)
                .await
                .map_err(|_| UseCaseError::StorageError)?;
        }

        Ok(slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::create_reminder_rule::CreateReminderRuleUseCase;
    use anniv_scheduler_domain::{
        AnchorDate, AnniversaryEvent, LunarDate, RepeatPattern, SlotConfig,
    };
    use anniv_scheduler_infra::ManualSys;
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use chrono_tz::Asia::Shanghai;
    use std::sync::Arc;

    #[tokio::test]
    async fn edited_anchor_moves_every_slot() {
        let mut ctx = AnnivContext::create_inmemory();
        ctx.sys = Arc::new(ManualSys::new(
            Shanghai
                .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
                .unwrap()
                .timestamp_millis(),
        ));
        let mut anniversary = AnniversaryEvent::new(
            AnchorDate::Gregorian(NaiveDate::from_ymd_opt(2020, 8, 15).unwrap()),
            RepeatPattern::Yearly,
            Shanghai,
        );
        ctx.repos.anniversaries.insert(&anniversary).await.unwrap();
        for _ in 0..2 {
            CreateReminderRuleUseCase {
                anniversary_id: anniversary.id.clone(),
                user_id: ID::new(),
                channels: vec![],
                slots: vec![SlotConfig::new(0, NaiveTime::from_hms_opt(8, 0, 0).unwrap())],
            }
            .execute(&ctx)
            .await
            .unwrap();
        }

        // Switch the same day to the lunar calendar: lunar 2025-08-15 is 2025-10-06
        anniversary.anchor = AnchorDate::Lunar(LunarDate::new(2020, 8, 15, false).unwrap());
        ctx.repos.anniversaries.save(&anniversary).await.unwrap();

        let slots = SyncAnniversaryRemindersUseCase {
            anniversary_id: anniversary.id.clone(),
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert_eq!(slots.len(), 2);
        for slot in slots {
            assert_eq!(
                slot.next_occurrence,
                Some(NaiveDate::from_ymd_opt(2025, 10, 6).unwrap())
            );
            let stored = ctx.repos.reminder_slots.find(&slot.id).await.unwrap().unwrap();
            assert_eq!(stored, slot);
        }
    }
}
