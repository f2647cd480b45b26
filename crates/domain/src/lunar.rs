//! Conversion between the Gregorian calendar and the Chinese lunisolar
//! calendar.
//!
//! Lunar month boundaries depend on astronomical new moons and cannot be
//! derived arithmetically, so every conversion is a lookup in a table of
//! per year month lengths covering lunar years 1900 through 2100.
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_LUNAR_YEAR: i32 = 1900;
pub const MAX_LUNAR_YEAR: i32 = 2100;

/// Days from the common era of 1900-01-31, the first day of lunar year 1900
const LUNAR_EPOCH_DAYS_FROM_CE: i32 = 693_626;

/// One entry per lunar year starting at 1900.
///
/// - bits 0..4: the leap month of the year, 0 when the year has none
/// - bits 4..16: month 1 at bit 15 down to month 12 at bit 4, set when the
///   month has 30 days instead of 29
/// - bit 16: set when the leap month has 30 days instead of 29
const LUNAR_INFO: [u32; 201] = [
    // 1900
    0x04bd8, 0x04ae0, 0x0a570, 0x054d5, 0x0d260, 0x0d950, 0x16554, 0x056a0, 0x09ad0, 0x055d2,
    // 1910
    0x04ae0, 0x0a5b6, 0x0a4d0, 0x0d250, 0x1d255, 0x0b540, 0x0d6a0, 0x0ada2, 0x095b0, 0x14977,
    // 1920
    0x04970, 0x0a4b0, 0x0b4b5, 0x06a50, 0x06d40, 0x1ab54, 0x02b60, 0x09570, 0x052f2, 0x04970,
    // 1930
    0x06566, 0x0d4a0, 0x0ea50, 0x16a95, 0x05ad0, 0x02b60, 0x186e3, 0x092e0, 0x1c8d7, 0x0c950,
    // 1940
    0x0d4a0, 0x1d8a6, 0x0b550, 0x056a0, 0x1a5b4, 0x025d0, 0x092d0, 0x0d2b2, 0x0a950, 0x0b557,
    // 1950
    0x06ca0, 0x0b550, 0x15355, 0x04da0, 0x0a5b0, 0x14573, 0x052b0, 0x0a9a8, 0x0e950, 0x06aa0,
    // 1960
    0x0aea6, 0x0ab50, 0x04b60, 0x0aae4, 0x0a570, 0x05260, 0x0f263, 0x0d950, 0x05b57, 0x056a0,
    // 1970
    0x096d0, 0x04dd5, 0x04ad0, 0x0a4d0, 0x0d4d4, 0x0d250, 0x0d558, 0x0b540, 0x0b6a0, 0x195a6,
    // 1980
    0x095b0, 0x049b0, 0x0a974, 0x0a4b0, 0x0b27a, 0x06a50, 0x06d40, 0x0af46, 0x0ab60, 0x09570,
    // 1990
    0x04af5, 0x04970, 0x064b0, 0x074a3, 0x0ea50, 0x06b58, 0x05ac0, 0x0ab60, 0x096d5, 0x092e0,
    // 2000
    0x0c960, 0x0d954, 0x0d4a0, 0x0da50, 0x07552, 0x056a0, 0x0abb7, 0x025d0, 0x092d0, 0x0cab5,
    // 2010
    0x0a950, 0x0b4a0, 0x0baa4, 0x0ad50, 0x055d9, 0x04ba0, 0x0a5b0, 0x15176, 0x052b0, 0x0a930,
    // 2020
    0x07954, 0x06aa0, 0x0ad50, 0x05b52, 0x04b60, 0x0a6e6, 0x0a4e0, 0x0d260, 0x0ea65, 0x0d530,
    // 2030
    0x05aa0, 0x076a3, 0x096d0, 0x04afb, 0x04ad0, 0x0a4d0, 0x1d0b6, 0x0d250, 0x0d520, 0x0dd45,
    // 2040
    0x0b5a0, 0x056d0, 0x055b2, 0x049b0, 0x0a577, 0x0a4b0, 0x0aa50, 0x1b255, 0x06d20, 0x0ada0,
    // 2050
    0x14b63, 0x09370, 0x049f8, 0x04970, 0x064b0, 0x168a6, 0x0ea50, 0x06b20, 0x1a6c4, 0x0aae0,
    // 2060
    0x0a2e0, 0x0d2e3, 0x0c960, 0x0d557, 0x0d4a0, 0x0da50, 0x05d55, 0x056a0, 0x0a6d0, 0x055d4,
    // 2070
    0x052d0, 0x0a9b8, 0x0a950, 0x0b4a0, 0x0b6a6, 0x0ad50, 0x055a0, 0x0aba4, 0x0a5b0, 0x052b0,
    // 2080
    0x0b273, 0x06930, 0x07337, 0x06aa0, 0x0ad50, 0x14b55, 0x04b60, 0x0a570, 0x054e4, 0x0d160,
    // 2090
    0x0e968, 0x0d520, 0x0daa0, 0x16aa6, 0x056d0, 0x04ae0, 0x0a9d4, 0x0a2d0, 0x0d150, 0x0f252,
    // 2100
    0x0d520,
];

fn year_info(year: i32) -> Option<u32> {
    if !(MIN_LUNAR_YEAR..=MAX_LUNAR_YEAR).contains(&year) {
        return None;
    }
    Some(LUNAR_INFO[(year - MIN_LUNAR_YEAR) as usize])
}

/// The leap month of a lunar year, if it has one
pub fn leap_month(year: i32) -> Option<u32> {
    match year_info(year)? & 0xf {
        0 => None,
        month => Some(month),
    }
}

/// Number of days (29 or 30) in a lunar month, or `None` when the year
/// has no such month
pub fn lunar_month_days(year: i32, month: u32, is_leap: bool) -> Option<u32> {
    let info = year_info(year)?;
    if !(1..=12).contains(&month) {
        return None;
    }
    let is_long = if is_leap {
        if leap_month(year) != Some(month) {
            return None;
        }
        info & 0x10000 != 0
    } else {
        info & (0x10000 >> month) != 0
    };
    Some(if is_long { 30 } else { 29 })
}

/// The months of a lunar year in calendar order, a leap month directly
/// following the regular month of the same number
fn months_of(year: i32) -> impl Iterator<Item = LunarMonth> {
    let leap = leap_month(year);
    (1..=12u32).flat_map(move |month| {
        let regular = std::iter::once(LunarMonth::new(year, month, false));
        let leap = if leap == Some(month) {
            Some(LunarMonth::new(year, month, true))
        } else {
            None
        };
        regular.chain(leap)
    })
}

pub fn lunar_year_days(year: i32) -> Option<u32> {
    year_info(year)?;
    Some(
        months_of(year)
            .filter_map(|m| lunar_month_days(m.year, m.month, m.is_leap))
            .sum(),
    )
}

/// Converts a lunar date to the Gregorian calendar.
///
/// Returns `None` when the lunar calendar has no such day: the year is
/// outside the supported era, the month is a leap month the year does not
/// have, or the day is past the end of a 29 day month.
pub fn lunar_to_solar(year: i32, month: u32, day: u32, is_leap: bool) -> Option<NaiveDate> {
    let month_days = lunar_month_days(year, month, is_leap)?;
    if day == 0 || day > month_days {
        return None;
    }

    let mut offset: i64 = (MIN_LUNAR_YEAR..year)
        .filter_map(lunar_year_days)
        .map(i64::from)
        .sum();
    let target = LunarMonth::new(year, month, is_leap);
    for m in months_of(year).take_while(|m| *m != target) {
        offset += i64::from(lunar_month_days(m.year, m.month, m.is_leap)?);
    }
    offset += i64::from(day - 1);

    let days_from_ce = i64::from(LUNAR_EPOCH_DAYS_FROM_CE) + offset;
    NaiveDate::from_num_days_from_ce_opt(i32::try_from(days_from_ce).ok()?)
}

/// Converts a Gregorian date to the lunar calendar. Every date from
/// 1900-01-31 through 2101-01-28 has exactly one lunar counterpart;
/// dates outside that era return `None`.
pub fn solar_to_lunar(date: NaiveDate) -> Option<LunarDate> {
    let mut offset = date.num_days_from_ce() - LUNAR_EPOCH_DAYS_FROM_CE;
    if offset < 0 {
        return None;
    }

    let mut year = MIN_LUNAR_YEAR;
    loop {
        let days = lunar_year_days(year)? as i32;
        if offset < days {
            break;
        }
        offset -= days;
        year += 1;
    }

    for m in months_of(year) {
        let days = lunar_month_days(m.year, m.month, m.is_leap)? as i32;
        if offset < days {
            return Some(LunarDate {
                year,
                month: m.month,
                day: offset as u32 + 1,
                is_leap: m.is_leap,
            });
        }
        offset -= days;
    }
    None
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LunarDateError {
    #[error("Lunar year {0} is outside the supported era 1900-2100")]
    YearOutOfRange(i32),
    #[error("Lunar month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),
    #[error("Lunar day must be between 1 and 30, got {0}")]
    InvalidDay(u32),
}

/// A date in the lunar calendar.
///
/// Construction only checks ranges. Whether the day exists in a particular
/// year is answered by `to_solar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LunarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub is_leap: bool,
}

impl LunarDate {
    pub fn new(year: i32, month: u32, day: u32, is_leap: bool) -> Result<Self, LunarDateError> {
        if !(MIN_LUNAR_YEAR..=MAX_LUNAR_YEAR).contains(&year) {
            return Err(LunarDateError::YearOutOfRange(year));
        }
        if !(1..=12).contains(&month) {
            return Err(LunarDateError::InvalidMonth(month));
        }
        if !(1..=30).contains(&day) {
            return Err(LunarDateError::InvalidDay(day));
        }
        Ok(Self {
            year,
            month,
            day,
            is_leap,
        })
    }

    pub fn to_solar(&self) -> Option<NaiveDate> {
        lunar_to_solar(self.year, self.month, self.day, self.is_leap)
    }

    pub fn lunar_month(&self) -> LunarMonth {
        LunarMonth::new(self.year, self.month, self.is_leap)
    }
}

/// A month position in the lunar calendar.
///
/// Ordering follows the calendar: a leap month sorts right after the
/// regular month of the same number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LunarMonth {
    pub year: i32,
    pub month: u32,
    pub is_leap: bool,
}

impl LunarMonth {
    pub fn new(year: i32, month: u32, is_leap: bool) -> Self {
        Self {
            year,
            month,
            is_leap,
        }
    }

    /// The month that follows this one, stepping into the leap month when
    /// the year has one after this month
    pub fn next(&self) -> Self {
        if !self.is_leap && leap_month(self.year) == Some(self.month) {
            Self::new(self.year, self.month, true)
        } else if self.month >= 12 {
            Self::new(self.year + 1, 1, false)
        } else {
            Self::new(self.year, self.month + 1, false)
        }
    }
}
