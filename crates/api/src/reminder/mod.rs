pub mod create_reminder_rule;
pub mod fire_due_reminders;
pub mod set_reminder_rule_enabled;
pub mod sync_anniversary_reminders;
pub mod update_reminder_rule;

use anniv_scheduler_domain::{
    Advance, AnniversaryEvent, Exhaustion, ScheduleError, SlotConfig, SlotSchedule,
};
use anniv_scheduler_infra::AnnivContext;
use tracing::{error, info, warn};

/// Computes the schedule to persist for a slot of `anniversary`, raising
/// the operator visible warnings the outcome calls for
pub(crate) fn next_schedule(
    ctx: &AnnivContext,
    anniversary: &AnniversaryEvent,
    slot: SlotConfig,
    now: i64,
) -> Result<SlotSchedule, ScheduleError> {
    let advance = ctx.config.advancer().advance(anniversary, slot, now);
    match &advance {
        Advance::Scheduled { skipped_cycles, .. } if *skipped_cycles > 1 => {
            warn!(
                "Reminder slot {:?} of anniversary {} skipped {} whole cycles, its offset may be larger than the repeat interval",
                slot, anniversary.id, skipped_cycles
            );
        }
        Advance::Scheduled { .. } => {}
        Advance::Exhausted(Exhaustion::NoFurtherOccurrence) => {
            info!(
                "Anniversary {} has no further occurrence for reminder slot {:?}",
                anniversary.id, slot
            );
        }
        Advance::Exhausted(reason) => {
            warn!(
                "Reminder slot {:?} of anniversary {} is exhausted: {:?}",
                slot, anniversary.id, reason
            );
        }
    }

    advance.into_schedule(now).map_err(|e| {
        error!(
            "Refusing to persist schedule of reminder slot {:?} for anniversary {}: {}",
            slot, anniversary.id, e
        );
        e
    })
}
