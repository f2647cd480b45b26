use crate::{
    anniversary::AnniversaryEvent,
    projection::{Projection, ProjectionHorizon},
    reminder::{ScheduleError, SlotConfig, SlotSchedule},
    trigger::compose,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Why a slot has no next trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhaustion {
    /// The single occurrence of a non repeating anniversary has passed
    NoFurtherOccurrence,
    /// The lunar anchor does not exist in the calendar
    UnresolvableAnchor,
    /// The occurrence search hit its horizon
    HorizonExceeded,
    /// Every cycle tried had a trigger that was already due
    CycleLimit,
    /// Date arithmetic left the supported calendar range
    OutOfRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Scheduled {
        occurrence: NaiveDate,
        trigger_at: DateTime<Tz>,
        /// Cycles passed over because their trigger was already due
        skipped_cycles: u32,
    },
    Exhausted(Exhaustion),
}

impl Advance {
    pub fn into_schedule(self, now: i64) -> Result<SlotSchedule, ScheduleError> {
        match self {
            Self::Scheduled {
                occurrence,
                trigger_at,
                ..
            } => SlotSchedule::scheduled(trigger_at.timestamp_millis(), occurrence, now),
            Self::Exhausted(_) => Ok(SlotSchedule::exhausted()),
        }
    }
}

/// Computes the next time a reminder slot fires. The returned trigger is
/// always strictly after `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderAdvancer {
    pub horizon: ProjectionHorizon,
    /// Upper bound on the cycles tried before giving up on a slot
    pub max_cycles: u32,
}

impl Default for ReminderAdvancer {
    fn default() -> Self {
        Self {
            horizon: ProjectionHorizon::default(),
            max_cycles: 8,
        }
    }
}

impl ReminderAdvancer {
    pub fn new(horizon: ProjectionHorizon, max_cycles: u32) -> Self {
        Self {
            horizon,
            max_cycles,
        }
    }

    pub fn advance(&self, event: &AnniversaryEvent, slot: SlotConfig, now: i64) -> Advance {
        let tz = event.timezone;
        let today = match Utc.timestamp_millis_opt(now).single() {
            Some(now) => now.with_timezone(&tz).date_naive(),
            None => return Advance::Exhausted(Exhaustion::OutOfRange),
        };
        // The earliest occurrence whose trigger date is not before today
        let mut reference =
            match today.checked_sub_signed(Duration::days(slot.offset_days as i64)) {
                Some(reference) => reference,
                None => return Advance::Exhausted(Exhaustion::OutOfRange),
            };

        for cycle in 0..self.max_cycles {
            let occurrence = match event.project(reference, &self.horizon) {
                Projection::Occurrence(occurrence) => occurrence,
                Projection::Ended => return Advance::Exhausted(Exhaustion::NoFurtherOccurrence),
                Projection::UnresolvableAnchor => {
                    return Advance::Exhausted(Exhaustion::UnresolvableAnchor)
                }
                Projection::HorizonExceeded => {
                    return Advance::Exhausted(Exhaustion::HorizonExceeded)
                }
            };
            let trigger_at = match compose(occurrence, slot.offset_days, slot.trigger_time, &tz) {
                Some(trigger_at) => trigger_at,
                None => return Advance::Exhausted(Exhaustion::OutOfRange),
            };
            if trigger_at.timestamp_millis() > now {
                return Advance::Scheduled {
                    occurrence,
                    trigger_at,
                    skipped_cycles: cycle,
                };
            }
            reference = match occurrence.succ_opt() {
                Some(next_day) => next_day,
                None => return Advance::Exhausted(Exhaustion::OutOfRange),
            };
        }

        Advance::Exhausted(Exhaustion::CycleLimit)
    }

    /// The next time the anniversary itself happens, at its event time
    pub fn next_occurrence_trigger(&self, event: &AnniversaryEvent, now: i64) -> Advance {
        self.advance(event, SlotConfig::new(0, event.event_time_or_midnight()), now)
    }
}
