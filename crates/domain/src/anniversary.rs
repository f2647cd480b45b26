use crate::{
    calendar::CalendarType,
    lunar::{LunarDate, LunarDateError},
    projection::{project, Projection, ProjectionHorizon},
    shared::{
        entity::{Entity, ID},
        recurrence::RepeatPattern,
    },
};
use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The date an anniversary recurs from, in the calendar it was defined in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "calendar", content = "date", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnchorDate {
    Gregorian(NaiveDate),
    Lunar(LunarDate),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AnchorDateError {
    #[error("A gregorian anchor needs a date")]
    MissingGregorianDate,
    #[error("A lunar anchor needs a year, month and day")]
    MissingLunarDate,
    #[error(transparent)]
    InvalidLunarDate(#[from] LunarDateError),
}

impl AnchorDate {
    pub fn calendar_type(&self) -> CalendarType {
        match self {
            Self::Gregorian(_) => CalendarType::Gregorian,
            Self::Lunar(_) => CalendarType::Lunar,
        }
    }

    /// Rebuilds an anchor from its stored columns
    pub fn from_parts(
        calendar_type: CalendarType,
        gregorian: Option<NaiveDate>,
        lunar: Option<(i32, u32, u32)>,
        lunar_is_leap: bool,
    ) -> Result<Self, AnchorDateError> {
        match calendar_type {
            CalendarType::Gregorian => gregorian
                .map(Self::Gregorian)
                .ok_or(AnchorDateError::MissingGregorianDate),
            CalendarType::Lunar => {
                let (year, month, day) = lunar.ok_or(AnchorDateError::MissingLunarDate)?;
                Ok(Self::Lunar(LunarDate::new(year, month, day, lunar_is_leap)?))
            }
        }
    }
}

/// A recurring anniversary that subscribed users are reminded of.
///
/// The scheduler only reads these, they are owned by the anniversary
/// management side of the product.
#[derive(Debug, Clone, PartialEq)]
pub struct AnniversaryEvent {
    pub id: ID,
    pub anchor: AnchorDate,
    pub repeat: RepeatPattern,
    /// Timezone every occurrence and reminder of this anniversary is
    /// computed in
    pub timezone: Tz,
    /// Time of day of the anniversary itself. Midnight when not set.
    pub event_time: Option<NaiveTime>,
}

impl Entity for AnniversaryEvent {
    fn id(&self) -> &ID {
        &self.id
    }
}

impl AnniversaryEvent {
    pub fn new(anchor: AnchorDate, repeat: RepeatPattern, timezone: Tz) -> Self {
        Self {
            id: Default::default(),
            anchor,
            repeat,
            timezone,
            event_time: None,
        }
    }

    pub fn calendar_type(&self) -> CalendarType {
        self.anchor.calendar_type()
    }

    /// The first occurrence on or after `reference`
    pub fn project(&self, reference: NaiveDate, horizon: &ProjectionHorizon) -> Projection {
        project(&self.anchor, self.repeat, reference, horizon)
    }

    pub fn event_time_or_midnight(&self) -> NaiveTime {
        self.event_time.unwrap_or(NaiveTime::MIN)
    }
}
