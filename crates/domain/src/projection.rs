use crate::{
    anniversary::AnchorDate,
    date::{add_months, months_between},
    lunar::{lunar_to_solar, solar_to_lunar, LunarDate},
    shared::recurrence::RepeatPattern,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Hard iteration limits for the lunar searches. Lunar month lengths and
/// leap months are irregular, so finding the next occurrence of a lunar
/// anchor means trying candidates one by one, and these bounds guarantee
/// the search terminates for anchors that rarely or never occur (a leap
/// month anchor, the 30th of a month that is usually short).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionHorizon {
    /// Lunar years tried for a yearly lunar anniversary
    pub lunar_years: u32,
    /// Lunar months tried for a monthly lunar anniversary
    pub lunar_months: u32,
    /// Periods tried for a half yearly or quarterly lunar anniversary
    pub lunar_periods: u32,
}

impl Default for ProjectionHorizon {
    fn default() -> Self {
        Self {
            lunar_years: 10,
            lunar_months: 24,
            lunar_periods: 50,
        }
    }
}

/// Outcome of looking for the next occurrence of an anniversary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Occurrence(NaiveDate),
    /// A non repeating anniversary whose single occurrence is before the
    /// reference date
    Ended,
    /// The lunar anchor names a day the lunar calendar does not have
    UnresolvableAnchor,
    /// The search gave up after the configured horizon
    HorizonExceeded,
}

impl Projection {
    pub fn occurrence(&self) -> Option<NaiveDate> {
        match self {
            Self::Occurrence(date) => Some(*date),
            _ => None,
        }
    }
}

/// Finds the first occurrence of `anchor` repeating by `pattern` that falls
/// on or after `reference`. Occurrences never precede the anchor itself.
pub fn project(
    anchor: &AnchorDate,
    pattern: RepeatPattern,
    reference: NaiveDate,
    horizon: &ProjectionHorizon,
) -> Projection {
    match (pattern, anchor) {
        (RepeatPattern::None, AnchorDate::Gregorian(date)) => single(*date, reference),
        (RepeatPattern::None, AnchorDate::Lunar(lunar)) => match lunar.to_solar() {
            Some(date) => single(date, reference),
            None => Projection::UnresolvableAnchor,
        },
        (RepeatPattern::Yearly, AnchorDate::Gregorian(date)) => {
            found(next_by_months(*date, 12, reference))
        }
        (RepeatPattern::HalfYearly, AnchorDate::Gregorian(date)) => {
            found(next_by_months(*date, 6, reference))
        }
        (RepeatPattern::Quarterly, AnchorDate::Gregorian(date)) => {
            found(next_by_months(*date, 3, reference))
        }
        (RepeatPattern::Monthly, AnchorDate::Gregorian(date)) => {
            found(next_by_months(*date, 1, reference))
        }
        (RepeatPattern::Weekly, AnchorDate::Gregorian(date)) => {
            found(next_by_days(*date, 7, reference))
        }
        (RepeatPattern::Daily, AnchorDate::Gregorian(date)) => {
            found(next_by_days(*date, 1, reference))
        }
        (RepeatPattern::Yearly, AnchorDate::Lunar(lunar)) => {
            lunar_yearly(lunar, reference, horizon.lunar_years)
        }
        (RepeatPattern::Monthly, AnchorDate::Lunar(lunar)) => {
            lunar_monthly(lunar, reference, horizon.lunar_months)
        }
        (RepeatPattern::HalfYearly, AnchorDate::Lunar(lunar)) => {
            lunar_interval(lunar, 6, reference, horizon.lunar_periods)
        }
        (RepeatPattern::Quarterly, AnchorDate::Lunar(lunar)) => {
            lunar_interval(lunar, 3, reference, horizon.lunar_periods)
        }
        // Weeks and days are the same length in both calendars
        (RepeatPattern::Weekly, AnchorDate::Lunar(lunar)) => match lunar.to_solar() {
            Some(date) => found(next_by_days(date, 7, reference)),
            None => Projection::UnresolvableAnchor,
        },
        (RepeatPattern::Daily, AnchorDate::Lunar(lunar)) => match lunar.to_solar() {
            Some(date) => found(next_by_days(date, 1, reference)),
            None => Projection::UnresolvableAnchor,
        },
    }
}

fn single(date: NaiveDate, reference: NaiveDate) -> Projection {
    if date >= reference {
        Projection::Occurrence(date)
    } else {
        Projection::Ended
    }
}

fn found(date: Option<NaiveDate>) -> Projection {
    match date {
        Some(date) => Projection::Occurrence(date),
        None => Projection::HorizonExceeded,
    }
}

/// Jumps straight to the period containing `reference` instead of stepping
/// from the anchor one period at a time. Every candidate is computed from
/// the anchor, so a 31st anchored monthly anniversary is back on the 31st
/// after passing through shorter months.
fn next_by_months(anchor: NaiveDate, step: u32, reference: NaiveDate) -> Option<NaiveDate> {
    if anchor >= reference {
        return Some(anchor);
    }
    let step = step as i32;
    let mut period = months_between(anchor, reference) / step;
    loop {
        let candidate = add_months(anchor, period * step)?;
        if candidate >= reference {
            return Some(candidate);
        }
        period += 1;
    }
}

fn next_by_days(anchor: NaiveDate, step: i64, reference: NaiveDate) -> Option<NaiveDate> {
    if anchor >= reference {
        return Some(anchor);
    }
    let elapsed = (reference - anchor).num_days();
    let periods = (elapsed + step - 1) / step;
    anchor.checked_add_signed(Duration::days(periods * step))
}

fn lunar_yearly(anchor: &LunarDate, reference: NaiveDate, horizon: u32) -> Projection {
    let start_year = solar_to_lunar(reference).map_or(anchor.year, |r| r.year.max(anchor.year));

    for year in (start_year..).take(horizon as usize) {
        if let Some(date) = lunar_to_solar(year, anchor.month, anchor.day, anchor.is_leap) {
            if date >= reference {
                return Projection::Occurrence(date);
            }
        }
    }
    Projection::HorizonExceeded
}

/// Walks the lunar months in calendar order, leap months included
fn lunar_monthly(anchor: &LunarDate, reference: NaiveDate, horizon: u32) -> Projection {
    let mut month = match solar_to_lunar(reference) {
        Some(r) => r.lunar_month().max(anchor.lunar_month()),
        None => anchor.lunar_month(),
    };

    for _ in 0..horizon {
        if let Some(date) = lunar_to_solar(month.year, month.month, anchor.day, month.is_leap) {
            if date >= reference {
                return Projection::Occurrence(date);
            }
        }
        month = month.next();
    }
    Projection::HorizonExceeded
}

/// Steps `step` numbered lunar months at a time from the anchor. Only the
/// anchor's own occurrence can be a leap month, the numbered months after
/// it are regular months.
fn lunar_interval(anchor: &LunarDate, step: u32, reference: NaiveDate, horizon: u32) -> Projection {
    let step = step as i32;
    let anchor_index = anchor.year * 12 + anchor.month as i32 - 1;
    let first_period = match solar_to_lunar(reference) {
        Some(r) => ((r.year * 12 + r.month as i32 - 1 - anchor_index) / step).max(0),
        None => 0,
    };

    for period in (first_period..).take(horizon as usize) {
        let index = anchor_index + period * step;
        let year = index.div_euclid(12);
        let month = index.rem_euclid(12) as u32 + 1;
        let is_leap = period == 0 && anchor.is_leap;
        if let Some(date) = lunar_to_solar(year, month, anchor.day, is_leap) {
            if date >= reference {
                return Projection::Occurrence(date);
            }
        }
    }
    Projection::HorizonExceeded
}
