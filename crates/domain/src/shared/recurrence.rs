use super::labels::{label_of, InvalidCodeError};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// How an anniversary repeats after its anchor date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepeatPattern {
    /// A single occurrence on the anchor date
    None,
    Yearly,
    Monthly,
    Weekly,
    Daily,
    /// Every 6 months
    HalfYearly,
    /// Every 3 months
    Quarterly,
}

const REPEAT_PATTERN_LABELS: [(RepeatPattern, &str); 7] = [
    (RepeatPattern::None, "Does not repeat"),
    (RepeatPattern::Yearly, "Every year"),
    (RepeatPattern::Monthly, "Every month"),
    (RepeatPattern::Weekly, "Every week"),
    (RepeatPattern::Daily, "Every day"),
    (RepeatPattern::HalfYearly, "Every half year"),
    (RepeatPattern::Quarterly, "Every three months"),
];

impl RepeatPattern {
    /// Stable storage code
    pub fn code(&self) -> i16 {
        match self {
            Self::None => 0,
            Self::Yearly => 1,
            Self::Monthly => 2,
            Self::Weekly => 3,
            Self::Daily => 4,
            Self::HalfYearly => 5,
            Self::Quarterly => 6,
        }
    }

    pub fn label(&self) -> &'static str {
        label_of(&REPEAT_PATTERN_LABELS, self)
    }

}

impl TryFrom<i16> for RepeatPattern {
    type Error = InvalidCodeError;

    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::Yearly),
            2 => Ok(Self::Monthly),
            3 => Ok(Self::Weekly),
            4 => Ok(Self::Daily),
            5 => Ok(Self::HalfYearly),
            6 => Ok(Self::Quarterly),
            _ => Err(InvalidCodeError {
                kind: "repeat pattern",
                code,
            }),
        }
    }
}
