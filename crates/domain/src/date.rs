use chrono::{Datelike, NaiveDate};

pub fn is_leap_year(year: i32) -> bool {
    year % 400 == 0 || (year % 100 != 0 && year % 4 == 0)
}

// month: January -> 1
pub fn get_month_length(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

/// Moves `date` by a whole number of months, keeping its day of month
/// where the target month has it and falling back to the last day of
/// the target month otherwise (Jan 31 + 1 month -> Feb 28/29).
pub fn add_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let month_index = date.year() * 12 + date.month0() as i32 + months;
    let year = month_index.div_euclid(12);
    let month = month_index.rem_euclid(12) as u32 + 1;
    let day = date.day().min(get_month_length(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Number of whole calendar months from `from` to `to`, ignoring days
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("Valid date")
    }

    #[test]
    fn it_knows_leap_years() {
        assert!(is_leap_year(2024));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2025));
    }

    #[test]
    fn it_knows_month_lengths() {
        assert_eq!(get_month_length(2024, 2), 29);
        assert_eq!(get_month_length(2025, 2), 28);
        assert_eq!(get_month_length(2025, 4), 30);
        assert_eq!(get_month_length(2025, 12), 31);
        assert_eq!(get_month_length(2025, 13), 0);
    }

    #[test]
    fn add_months_clamps_to_the_end_of_shorter_months() {
        assert_eq!(add_months(date(2025, 1, 31), 1), Some(date(2025, 2, 28)));
        assert_eq!(add_months(date(2024, 1, 31), 1), Some(date(2024, 2, 29)));
        assert_eq!(add_months(date(2025, 1, 31), 3), Some(date(2025, 4, 30)));
        assert_eq!(add_months(date(2024, 2, 29), 12), Some(date(2025, 2, 28)));
        assert_eq!(add_months(date(2025, 11, 15), 2), Some(date(2026, 1, 15)));
        assert_eq!(add_months(date(2025, 1, 15), -1), Some(date(2024, 12, 15)));
    }

    #[test]
    fn months_between_ignores_days() {
        assert_eq!(months_between(date(2024, 2, 29), date(2025, 6, 1)), 16);
        assert_eq!(months_between(date(2025, 6, 30), date(2025, 6, 1)), 0);
        assert_eq!(months_between(date(2025, 6, 1), date(2025, 3, 1)), -3);
    }
}
