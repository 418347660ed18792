//! Calendar date helpers
//!
//! The library API sends dates either as plain `YYYY-MM-DD` strings or as
//! full RFC 3339 timestamps. Everything in the circulation logic works on
//! calendar days, so the time component is discarded here.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};

/// Accepted plain-date layouts, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a date as sent by the API or typed by a user.
///
/// Returns `None` for empty or unrecognized input rather than an error;
/// callers decide whether a missing date fails open or closed.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Today's date on the local calendar
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Format a date for display, e.g. `Jan 05, 2024`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

/// Format a raw API date for display, falling back to `-` when unparseable
pub fn format_raw_date(raw: Option<&str>) -> String {
    raw.and_then(parse_date)
        .map(format_date)
        .unwrap_or_else(|| "-".to_string())
}

/// Format a date the way the API expects it in request bodies
pub fn to_api_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Advance `start` by `days` business days, skipping Saturdays and Sundays.
///
/// The start date itself is never counted. Adding zero days returns `start`
/// unchanged even when it falls on a weekend.
pub fn add_business_days(start: NaiveDate, days: u32) -> NaiveDate {
    let mut current = start;
    let mut remaining = days;
    while remaining > 0 {
        current += Duration::days(1);
        if !is_weekend(current) {
            remaining -= 1;
        }
    }
    current
}

/// First and last day of the given month
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, next - Duration::days(1)))
}
