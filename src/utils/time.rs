//! Calendar windows and range membership used to filter sessions for reports.
//!
//! Parsing helpers return `None` on malformed input, and range constructors
//! return `None` for out-of-range months, weeks or years instead of wrapping.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone};

/// Inclusive `(first_day, last_day)` pair
pub type DateRange = (NaiveDate, NaiveDate);

/// Parse `YYYY-MM-DD`
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Parse `YYYY-MM` into `(year, month)`
pub fn parse_month(s: &str) -> Option<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d").ok()?;
    Some((date.year(), date.month()))
}

/// First through last calendar day of `month` in `year`
pub fn month_range(year: i32, month: u32) -> Option<DateRange> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, next_month.pred_opt()?))
}

/// Monday through Sunday of ISO-8601 `week` in `year`.
///
/// Week 1 is the week containing January 4th. Weeks outside 1..=53 are
/// rejected.
pub fn week_range(year: i32, week: u32) -> Option<DateRange> {
    if !(1..=53).contains(&week) {
        return None;
    }

    let jan_4 = NaiveDate::from_ymd_opt(year, 1, 4)?;
    let week_one_monday =
        jan_4.checked_sub_days(Days::new(jan_4.weekday().num_days_from_monday() as u64))?;
    let start = week_one_monday.checked_add_days(Days::new(7 * (week as u64 - 1)))?;
    let end = start.checked_add_days(Days::new(6))?;
    Some((start, end))
}

/// January 1st through December 31st
pub fn year_range(year: i32) -> Option<DateRange> {
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

/// Month containing `today`
pub fn current_month_range(today: NaiveDate) -> Option<DateRange> {
    month_range(today.year(), today.month())
}

/// ISO week containing `today`
pub fn current_week_range(today: NaiveDate) -> Option<DateRange> {
    let iso = today.iso_week();
    week_range(iso.year(), iso.week())
}

/// Inclusive on both ends; a missing bound is unbounded on that side
pub fn date_in_range(date: NaiveDate, start: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    if start.is_some_and(|start| date < start) {
        return false;
    }
    if end.is_some_and(|end| date > end) {
        return false;
    }
    true
}

/// [`date_in_range`] on the calendar date of `datetime` in its own timezone
pub fn datetime_in_range<Tz: TimeZone>(
    datetime: &DateTime<Tz>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> bool {
    date_in_range(datetime.date_naive(), start, end)
}

/// Label such as `"All time"`, `"From 2024-01-01"` or `"2024-01-01 to 2024-01-31"`
pub fn format_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
    match (start, end) {
        (None, None) => "All time".to_string(),
        (None, Some(end)) => format!("Up to {}", end.format("%Y-%m-%d")),
        (Some(start), None) => format!("From {}", start.format("%Y-%m-%d")),
        (Some(start), Some(end)) if start == end => start.format("%Y-%m-%d").to_string(),
        (Some(start), Some(end)) => {
            format!("{} to {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
        }
    }
}
