use super::next_schedule;
use crate::shared::usecase::UseCase;
use anniv_scheduler_domain::{AnniversaryEvent, ReminderDispatch, ReminderRule, SlotSchedule, ID};
use anniv_scheduler_infra::AnnivContext;
use std::collections::HashMap;
use tracing::{debug, error, warn};

/// Claims one batch of due reminder slots, dispatches them and rolls every
/// slot forward to its next trigger.
///
/// A slot whose dispatch fails is left untouched and stays due for the next
/// poll. Slots claimed by another scanner are skipped, not waited for.
#[derive(Debug)]
pub struct FireDueRemindersUseCase {
    pub batch_size: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FireReport {
    pub claimed: usize,
    pub dispatched: usize,
    /// Slots left without a further trigger by this batch
    pub exhausted: usize,
    pub failed: usize,
}

impl FireReport {
    /// Whether another batch is likely waiting. A batch with failures stops
    /// the drain so the failing slots are not claimed again right away.
    pub fn has_backlog(&self, batch_size: i64) -> bool {
        self.failed == 0 && self.claimed as i64 >= batch_size
    }
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    StorageError,
}

#[async_trait::async_trait]
impl UseCase for FireDueRemindersUseCase {
    type Response = FireReport;

    type Errors = UseCaseError;

    async fn execute(&mut self, ctx: &AnnivContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_timestamp_millis();
        let mut claim = ctx
            .repos
            .reminder_slots
            .claim_due(now, self.batch_size)
            .await
            .map_err(|e| {
                error!("Unable to claim due reminder slots. Error: {:?}", e);
                UseCaseError::StorageError
            })?;
        let slots = claim.slots().to_vec();
        let mut report = FireReport {
            claimed: slots.len(),
            ..Default::default()
        };
        if slots.is_empty() {
            return Ok(report);
        }

        let rules = load_rules(ctx, slots.iter().map(|s| s.rule_id.clone()).collect()).await?;
        let anniversaries = load_anniversaries(
            ctx,
            rules.values().map(|r| r.anniversary_id.clone()).collect(),
        )
        .await?;

        for slot in &slots {
            let rule = rules.get(&slot.rule_id);
            let anniversary = rule.and_then(|r| anniversaries.get(&r.anniversary_id));
            let (rule, anniversary) = match (rule, anniversary) {
                (Some(rule), Some(anniversary)) => (rule, anniversary),
                _ => {
                    warn!(
                        "Reminder slot {} has no readable rule or anniversary, marking it exhausted",
                        slot.id
                    );
                    match claim.advance(&slot.id, SlotSchedule::exhausted(), None).await {
                        Ok(_) => report.exhausted += 1,
                        Err(e) => {
                            error!("Unable to exhaust orphan slot {}. Error: {:?}", slot.id, e);
                            report.failed += 1;
                        }
                    }
                    continue;
                }
            };

            // The next schedule is known to be valid before anything is sent
            let schedule = match next_schedule(ctx, anniversary, slot.config(), now) {
                Ok(schedule) => schedule,
                Err(_) => {
                    report.failed += 1;
                    continue;
                }
            };

            let dispatch = match slot.next_occurrence {
                Some(occurrence) => ReminderDispatch::new(
                    rule,
                    slot,
                    occurrence,
                    slot.next_trigger_at.unwrap_or(now),
                    now,
                ),
                None => {
                    error!(
                        "Due reminder slot {} has no occurrence stored, rolling it forward without dispatch",
                        slot.id
                    );
                    if let Err(e) = claim.advance(&slot.id, schedule, None).await {
                        error!("Unable to advance slot {}. Error: {:?}", slot.id, e);
                    }
                    report.failed += 1;
                    continue;
                }
            };

            if let Err(e) = ctx.notifier.dispatch(&dispatch).await {
                warn!(
                    "Dispatch {} failed, slot {} stays due. Error: {:?}",
                    dispatch.dedupe_key(),
                    slot.id,
                    e
                );
                report.failed += 1;
                continue;
            }

            if let Err(e) = claim.advance(&slot.id, schedule, Some(&dispatch)).await {
                error!(
                    "Dispatched {} but unable to advance slot {}, it will fire again. Error: {:?}",
                    dispatch.dedupe_key(),
                    slot.id,
                    e
                );
                report.failed += 1;
                continue;
            }
            debug!(
                "Dispatched {}, next trigger of slot {}: {:?}",
                dispatch.dedupe_key(),
                slot.id,
                schedule.trigger_at()
            );
            report.dispatched += 1;
            if schedule.is_exhausted() {
                report.exhausted += 1;
            }
        }

        claim.commit().await.map_err(|e| {
            error!("Unable to commit fired reminder slots. Error: {:?}", e);
            UseCaseError::StorageError
        })?;

        Ok(report)
    }
}

async fn load_rules(
    ctx: &AnnivContext,
    mut rule_ids: Vec<ID>,
) -> Result<HashMap<ID, ReminderRule>, UseCaseError> {
    rule_ids.sort();
    rule_ids.dedup();
    let rules = ctx
        .repos
        .reminder_rules
        .find_many(&rule_ids)
        .await
        .map_err(|_| UseCaseError::StorageError)?;
    Ok(rules.into_iter().map(|r| (r.id.clone(), r)).collect())
}

async fn load_anniversaries(
    ctx: &AnnivContext,
    mut anniversary_ids: Vec<ID>,
) -> Result<HashMap<ID, AnniversaryEvent>, UseCaseError> {
    anniversary_ids.sort();
    anniversary_ids.dedup();
    let anniversaries = ctx
        .repos
        .anniversaries
        .find_many(&anniversary_ids)
        .await
        .map_err(|_| UseCaseError::StorageError)?;
    Ok(anniversaries
        .into_iter()
        .map(|a| (a.id.clone(), a))
        .collect())
}
