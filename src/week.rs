//! ISO-8601 week keys.
//!
//! Snippets are keyed by `(year, week)` of the ISO calendar rather than by a
//! date: week 1 is the week holding the year's first Thursday, weeks run
//! Monday to Sunday, and a year has 52 or 53 of them.

use std::fmt;

use chrono::{Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// A `(year, week)` pair of the ISO calendar.
///
/// Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IsoWeek {
    pub year: i32,
    pub week: u32,
}

impl IsoWeek {
    /// Build a key without validating it, see [`is_valid_iso_week`].
    pub const fn new(year: i32, week: u32) -> Self {
        Self { year, week }
    }

    /// The Monday this week begins on, or `None` if the week does not exist.
    pub fn monday(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
    }

    /// Whether this week exists in the ISO calendar.
    pub fn exists(&self) -> bool {
        self.week >= 1 && self.week <= weeks_in_year(self.year)
    }
}

impl fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// The ISO week a calendar date falls in.
///
/// Note the ISO year can differ from the calendar year around new year:
/// 2021-01-03 is in week 53 of 2020.
pub fn week_of(date: NaiveDate) -> IsoWeek {
    let iso = date.iso_week();
    IsoWeek::new(iso.year(), iso.week())
}

/// The Monday beginning the ISO week that contains `date`.
pub fn iso_week_begin(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday();
    date - chrono::Duration::days(offset.into())
}

/// Number of ISO weeks in `year`, 52 or 53.
///
/// December 28th always lies in the last week of its ISO year.
pub fn weeks_in_year(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 28)
        .map(|d| d.iso_week().week())
        .unwrap_or(0)
}

/// The week containing `today`.
pub fn current_week(today: NaiveDate) -> IsoWeek {
    week_of(today)
}

/// The week containing the current UTC date.
pub fn this_week() -> IsoWeek {
    current_week(Utc::now().date_naive())
}

/// Whether `(year, week)` names an existing ISO week that is not after the
/// week containing `today`.
pub fn is_valid_iso_week(year: i32, week: u32, today: NaiveDate) -> bool {
    let key = IsoWeek::new(year, week);
    key.exists() && key <= current_week(today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_of() {
        assert_eq!(week_of(date(2017, 3, 1)), IsoWeek::new(2017, 9));
        assert_eq!(week_of(date(2021, 1, 3)), IsoWeek::new(2020, 53));
        assert_eq!(week_of(date(2021, 1, 4)), IsoWeek::new(2021, 1));
        assert_eq!(week_of(date(2019, 12, 30)), IsoWeek::new(2020, 1));
    }

    #[test]
    fn test_iso_week_begin() {
        assert_eq!(iso_week_begin(date(2021, 1, 8)), date(2021, 1, 4));
        assert_eq!(iso_week_begin(date(2021, 1, 4)), date(2021, 1, 4));
        assert_eq!(iso_week_begin(date(2021, 1, 3)), date(2020, 12, 28));
        assert_eq!(iso_week_begin(date(2020, 7, 4)), date(2020, 6, 29));
    }

    #[test]
    fn test_monday_matches_week_begin() {
        let d = date(2017, 11, 13);
        assert_eq!(week_of(d).monday(), Some(iso_week_begin(d)));
        assert_eq!(IsoWeek::new(2019, 53).monday(), None);
    }

    #[test]
    fn test_weeks_in_year() {
        assert_eq!(weeks_in_year(2017), 52);
        assert_eq!(weeks_in_year(2020), 53);
        assert_eq!(weeks_in_year(2021), 52);
        assert_eq!(weeks_in_year(2026), 53);
    }

    #[test]
    fn test_is_valid_iso_week_bounds() {
        let today = date(2021, 4, 22);
        assert!(is_valid_iso_week(2017, 9, today));
        assert!(is_valid_iso_week(2020, 53, today));
        assert!(!is_valid_iso_week(2019, 53, today));
        assert!(!is_valid_iso_week(2017, 0, today));
        assert!(!is_valid_iso_week(2017, 54, today));
    }

    #[test]
    fn test_is_valid_iso_week_rejects_future() {
        let today = date(2021, 4, 22);
        assert!(is_valid_iso_week(2021, 16, today));
        assert!(!is_valid_iso_week(2021, 17, today));
        assert!(!is_valid_iso_week(2022, 1, today));
        assert!(!is_valid_iso_week(2099, 1, today));
    }

    #[test]
    fn test_every_past_date_is_valid() {
        let today = date(2021, 1, 10);
        let mut d = date(2015, 12, 20);
        while d <= today {
            let key = week_of(d);
            assert!(is_valid_iso_week(key.year, key.week, today), "{d} -> {key}");
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(IsoWeek::new(2017, 9).to_string(), "2017-W09");
    }
}
