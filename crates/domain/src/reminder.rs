use crate::shared::{
    entity::{Entity, ID},
    labels::{label_of, InvalidCodeError},
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use thiserror::Error;

/// How a user wants to be told about a reminder. Delivery itself happens
/// outside of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderChannel {
    SiteMessage,
    Email,
    Sms,
}

const REMINDER_CHANNEL_LABELS: [(ReminderChannel, &str); 3] = [
    (ReminderChannel::SiteMessage, "Site message"),
    (ReminderChannel::Email, "Email"),
    (ReminderChannel::Sms, "SMS"),
];

impl ReminderChannel {
    pub fn code(&self) -> i16 {
        match self {
            Self::SiteMessage => 1,
            Self::Email => 2,
            Self::Sms => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        label_of(&REMINDER_CHANNEL_LABELS, self)
    }
}

impl TryFrom<i16> for ReminderChannel {
    type Error = InvalidCodeError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::SiteMessage),
            2 => Ok(Self::Email),
            3 => Ok(Self::Sms),
            _ => Err(InvalidCodeError {
                kind: "reminder channel",
                code,
            }),
        }
    }
}

/// A user's subscription to the reminders of one anniversary.
///
/// There is at most one rule per (anniversary, user). Users opt out by
/// disabling the rule, the rule and its slots are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderRule {
    pub id: ID,
    pub anniversary_id: ID,
    pub user_id: ID,
    pub channels: Vec<ReminderChannel>,
    pub enabled: bool,
    pub created: i64,
    pub updated: i64,
}

impl Entity for ReminderRule {
    fn id(&self) -> &ID {
        &self.id
    }
}

impl ReminderRule {
    pub fn new(anniversary_id: ID, user_id: ID, channels: Vec<ReminderChannel>, now: i64) -> Self {
        Self {
            id: Default::default(),
            anniversary_id,
            user_id,
            channels: normalize_channels(channels),
            enabled: true,
            created: now,
            updated: now,
        }
    }

    pub fn set_channels(&mut self, channels: Vec<ReminderChannel>) {
        self.channels = normalize_channels(channels);
    }
}

fn normalize_channels(mut channels: Vec<ReminderChannel>) -> Vec<ReminderChannel> {
    channels.sort();
    channels.dedup();
    channels
}

/// When, relative to an occurrence, a reminder should fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotConfig {
    /// Days from the occurrence, negative is before it
    pub offset_days: i32,
    pub trigger_time: NaiveTime,
}

impl SlotConfig {
    pub fn new(offset_days: i32, trigger_time: NaiveTime) -> Self {
        Self {
            offset_days,
            trigger_time,
        }
    }

    /// Sorts the configurations and collapses duplicates
    pub fn dedup(mut configs: Vec<Self>) -> Vec<Self> {
        configs.sort();
        configs.dedup();
        configs
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Computed trigger at {trigger_at} is not after now ({now})")]
    NotInFuture { trigger_at: i64, now: i64 },
}

/// The next firing of a slot, ready to be persisted.
///
/// A schedule either has no next firing, or one that was strictly in the
/// future when it was computed. There is no way to build a schedule that
/// is already due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSchedule {
    next: Option<(i64, NaiveDate)>,
}

impl SlotSchedule {
    pub fn exhausted() -> Self {
        Self { next: None }
    }

    pub fn scheduled(
        trigger_at: i64,
        occurrence: NaiveDate,
        now: i64,
    ) -> Result<Self, ScheduleError> {
        if trigger_at <= now {
            return Err(ScheduleError::NotInFuture { trigger_at, now });
        }
        Ok(Self {
            next: Some((trigger_at, occurrence)),
        })
    }

    pub fn trigger_at(&self) -> Option<i64> {
        self.next.map(|(trigger_at, _)| trigger_at)
    }

    pub fn occurrence(&self) -> Option<NaiveDate> {
        self.next.map(|(_, occurrence)| occurrence)
    }

    pub fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }
}

/// One (offset, time of day) reminder of a rule together with its
/// scheduling state
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderSlot {
    pub id: ID,
    pub rule_id: ID,
    pub offset_days: i32,
    pub trigger_time: NaiveTime,
    /// Millis timestamp of the next firing, `None` once the anniversary has
    /// no further occurrences
    pub next_trigger_at: Option<i64>,
    /// The occurrence `next_trigger_at` fires for
    pub next_occurrence: Option<NaiveDate>,
}

impl Entity for ReminderSlot {
    fn id(&self) -> &ID {
        &self.id
    }
}

impl ReminderSlot {
    pub fn new(rule_id: ID, config: SlotConfig, schedule: SlotSchedule) -> Self {
        let mut slot = Self {
            id: Default::default(),
            rule_id,
            offset_days: config.offset_days,
            trigger_time: config.trigger_time,
            next_trigger_at: None,
            next_occurrence: None,
        };
        slot.apply(schedule);
        slot
    }

    pub fn config(&self) -> SlotConfig {
        SlotConfig::new(self.offset_days, self.trigger_time)
    }

    pub fn apply(&mut self, schedule: SlotSchedule) {
        self.next_trigger_at = schedule.trigger_at();
        self.next_occurrence = schedule.occurrence();
    }

    pub fn is_exhausted(&self) -> bool {
        self.next_trigger_at.is_none()
    }

    pub fn is_due(&self, now: i64) -> bool {
        matches!(self.next_trigger_at, Some(trigger_at) if trigger_at <= now)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReminderRuleWithSlots {
    pub rule: ReminderRule,
    pub slots: Vec<ReminderSlot>,
}

/// Record of one slot firing for one occurrence. At most one exists per
/// (slot, occurrence).
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderDispatch {
    pub id: ID,
    pub rule_id: ID,
    pub slot_id: ID,
    pub user_id: ID,
    pub anniversary_id: ID,
    pub channels: Vec<ReminderChannel>,
    pub occurrence_date: NaiveDate,
    /// When the slot was due
    pub scheduled_at: i64,
    pub dispatched_at: i64,
}

impl Entity for ReminderDispatch {
    fn id(&self) -> &ID {
        &self.id
    }
}

impl ReminderDispatch {
    pub fn new(
        rule: &ReminderRule,
        slot: &ReminderSlot,
        occurrence_date: NaiveDate,
        scheduled_at: i64,
        dispatched_at: i64,
    ) -> Self {
        Self {
            id: Default::default(),
            rule_id: rule.id.clone(),
            slot_id: slot.id.clone(),
            user_id: rule.user_id.clone(),
            anniversary_id: rule.anniversary_id.clone(),
            channels: rule.channels.clone(),
            occurrence_date,
            scheduled_at,
            dispatched_at,
        }
    }

    /// Stable across retries of the same firing, lets receivers drop
    /// duplicates
    pub fn dedupe_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.rule_id,
            self.slot_id,
            self.occurrence_date.format("%Y-%m-%d")
        )
    }
}
