use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

/// One fully-elapsed calendar month covered by a report run.
///
/// `start` is the first instant of the month (00:00:00 UTC on day 1) and
/// `end` is the last second (23:59:59 UTC on the last day), both inclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportingPeriod {
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportingPeriod {
    fn for_month(year: i32, month: u32) -> Self {
        let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid month");
        let (next_year, next_month) = step_month(year, month, 1);
        let next_first = NaiveDate::from_ymd_opt(next_year, next_month, 1).expect("valid month");

        let start = Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0).expect("midnight"));
        let end = Utc.from_utc_datetime(&next_first.and_hms_opt(0, 0, 0).expect("midnight"))
            - Duration::seconds(1);
        let name = start.format("%B %Y").to_string();

        Self { name, start, end }
    }
}

/// Add `delta` months to (year, month), carrying across year boundaries.
fn step_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let total = year * 12 + (month as i32 - 1) + delta;
    (total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
}

/// The three calendar months immediately preceding `now`'s month, oldest
/// first. Pure function of the run instant.
pub fn last_three_full_months(now: DateTime<Utc>) -> [ReportingPeriod; 3] {
    let (year, month) = (now.year(), now.month());
    std::array::from_fn(|i| {
        let (y, m) = step_month(year, month, i as i32 - 3);
        ReportingPeriod::for_month(y, m)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 10, 30, 0).unwrap()
    }

    #[test]
    fn returns_three_ordered_contiguous_periods() {
        let periods = last_three_full_months(at(2025, 6, 15));
        assert_eq!(periods.len(), 3);
        assert_eq!(periods[0].name, "March 2025");
        assert_eq!(periods[1].name, "April 2025");
        assert_eq!(periods[2].name, "May 2025");
        for pair in periods.windows(2) {
            assert!(pair[0].end < pair[1].start);
            assert_eq!(pair[1].start - pair[0].end, Duration::seconds(1));
        }
    }

    #[test]
    fn periods_end_before_current_month() {
        let now = at(2025, 6, 1);
        let periods = last_three_full_months(now);
        let month_start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        assert!(periods[2].end < month_start);
    }

    #[test]
    fn january_run_rolls_back_into_prior_year() {
        let periods = last_three_full_months(at(2026, 1, 5));
        assert_eq!(periods[0].name, "October 2025");
        assert_eq!(periods[1].name, "November 2025");
        assert_eq!(periods[2].name, "December 2025");
        assert_eq!(periods[0].start.year(), 2025);
    }

    #[test]
    fn march_run_covers_leap_february() {
        let periods = last_three_full_months(at(2024, 3, 20));
        let feb = &periods[2];
        assert_eq!(feb.name, "February 2024");
        assert_eq!(
            feb.end,
            Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap()
        );
    }

    #[test]
    fn period_bounds_are_month_edges() {
        let periods = last_three_full_months(at(2025, 8, 24));
        let may = &periods[0];
        assert_eq!(may.start, Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap());
        assert_eq!(may.end, Utc.with_ymd_and_hms(2025, 5, 31, 23, 59, 59).unwrap());
    }

    #[test]
    fn step_month_carries_both_directions() {
        assert_eq!(step_month(2025, 1, -1), (2024, 12));
        assert_eq!(step_month(2025, 12, 1), (2026, 1));
        assert_eq!(step_month(2025, 6, -3), (2025, 3));
        assert_eq!(step_month(2025, 2, -14), (2023, 12));
    }
}
