use crate::shared::labels::{label_of, InvalidCodeError};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// The calendar an anniversary's anchor date is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalendarType {
    Gregorian,
    /// Chinese lunisolar calendar
    Lunar,
}

const CALENDAR_TYPE_LABELS: [(CalendarType, &str); 2] = [
    (CalendarType::Gregorian, "Gregorian calendar"),
    (CalendarType::Lunar, "Lunar calendar"),
];

impl CalendarType {
    pub fn code(&self) -> i16 {
        match self {
            Self::Gregorian => 1,
            Self::Lunar => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        label_of(&CALENDAR_TYPE_LABELS, self)
    }
}

impl TryFrom<i16> for CalendarType {
    type Error = InvalidCodeError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Gregorian),
            2 => Ok(Self::Lunar),
            _ => Err(InvalidCodeError {
                kind: "calendar type",
                code,
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_round_trip() {
        assert_eq!(CalendarType::try_from(1), Ok(CalendarType::Gregorian));
        assert_eq!(CalendarType::try_from(2), Ok(CalendarType::Lunar));
        assert_eq!(
            CalendarType::try_from(0),
            Err(InvalidCodeError {
                kind: "calendar type",
                code: 0
            })
        );
        assert_eq!(CalendarType::Lunar.label(), "Lunar calendar");
    }
}
