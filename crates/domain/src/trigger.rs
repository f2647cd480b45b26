use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// Combines an occurrence date with a reminder offset and time of day into
/// the instant the reminder fires.
///
/// The offset is applied to the occurrence date as whole calendar days, so a
/// reminder at 09:00 one day before stays at 09:00 local time across a
/// daylight saving change. Local times that happen twice resolve to the
/// first of the two, local times skipped by a daylight saving gap move
/// forward to the first valid hour after the gap.
///
/// Returns `None` only when the date arithmetic leaves the supported range.
pub fn compose(
    occurrence: NaiveDate,
    offset_days: i32,
    trigger_time: NaiveTime,
    tz: &Tz,
) -> Option<DateTime<Tz>> {
    let date = occurrence.checked_add_signed(Duration::days(offset_days as i64))?;
    resolve_local(tz, date.and_time(trigger_time))
}

fn resolve_local(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => (1..=24).find_map(|hours| {
            local
                .checked_add_signed(Duration::hours(hours))
                .and_then(|shifted| tz.from_local_datetime(&shifted).earliest())
        }),
    }
}
