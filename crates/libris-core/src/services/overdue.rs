//! Overdue and renewal calculations
//!
//! Pure functions over calendar dates. `today` is always passed in so results
//! are reproducible; the CLI supplies [`crate::dates::today`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{add_business_days, parse_date};

/// Flat fine charged per day overdue
pub const DEFAULT_DAILY_FINE: f64 = 2.0;

/// Days a renewal extends a loan by
pub const DEFAULT_RENEWAL_DAYS: u32 = 5;

/// Longest loan or renewal period, in business days
pub const MAX_LOAN_DAYS: u32 = 60;

/// Whether `due_date` is strictly before `today`.
///
/// Invalid or empty dates are treated as not overdue.
pub fn is_overdue(due_date: &str, today: NaiveDate) -> bool {
    match parse_date(due_date) {
        Some(due) => due < today,
        None => false,
    }
}

/// Whole days past due, never negative. Invalid dates count as zero.
pub fn days_overdue(due_date: &str, today: NaiveDate) -> i64 {
    match parse_date(due_date) {
        Some(due) => (today - due).num_days().max(0),
        None => 0,
    }
}

/// Fine owed for a due date at a flat daily rate. Uncapped.
pub fn overdue_fine(due_date: &str, today: NaiveDate, daily_rate: f64) -> f64 {
    days_overdue(due_date, today) as f64 * daily_rate
}

/// Daily fine configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinePolicy {
    pub daily_rate: f64,
}

impl Default for FinePolicy {
    fn default() -> Self {
        Self {
            daily_rate: DEFAULT_DAILY_FINE,
        }
    }
}

impl FinePolicy {
    pub fn new(daily_rate: f64) -> Self {
        Self { daily_rate }
    }

    pub fn fine_for(&self, due_date: &str, today: NaiveDate) -> f64 {
        overdue_fine(due_date, today, self.daily_rate)
    }
}

/// Computes the due date a loan gets when it is renewed
pub trait RenewalPolicy: Send + Sync {
    /// Short identifier used in config and logs
    fn name(&self) -> &'static str;

    fn next_due_date(&self, current_due: NaiveDate) -> NaiveDate;
}

/// Extends the due date by N weekdays. This is the default policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessDayRenewal {
    pub days: u32,
}

impl Default for BusinessDayRenewal {
    fn default() -> Self {
        Self {
            days: DEFAULT_RENEWAL_DAYS,
        }
    }
}

impl RenewalPolicy for BusinessDayRenewal {
    fn name(&self) -> &'static str {
        "business_days"
    }

    fn next_due_date(&self, current_due: NaiveDate) -> NaiveDate {
        add_business_days(current_due, self.days)
    }
}

/// Next due date under the default business-day policy
pub fn next_renewal_due_date(current_due: NaiveDate) -> NaiveDate {
    BusinessDayRenewal::default().next_due_date(current_due)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_is_overdue_past_today_future() {
        let today = d("2024-03-15");
        assert!(is_overdue("2024-03-14", today));
        assert!(is_overdue("2023-12-31", today));
        assert!(!is_overdue("2024-03-15", today));
        assert!(!is_overdue("2024-03-16", today));
    }

    #[test]
    fn test_is_overdue_fails_open_on_bad_input() {
        let today = d("2024-03-15");
        assert!(!is_overdue("", today));
        assert!(!is_overdue("someday", today));
    }

    #[test]
    fn test_is_overdue_ignores_time_of_day() {
        // Due later today is not overdue even though the timestamp is in the past
        let today = d("2024-03-15");
        assert!(!is_overdue("2024-03-15T00:00:01Z", today));
        assert!(is_overdue("2024-03-14T23:59:59Z", today));
    }

    #[test]
    fn test_days_overdue_never_negative() {
        let today = d("2024-03-15");
        assert_eq!(days_overdue("2024-03-20", today), 0);
        assert_eq!(days_overdue("2024-03-15", today), 0);
        assert_eq!(days_overdue("2024-03-14", today), 1);
        assert_eq!(days_overdue("invalid", today), 0);
    }

    #[test]
    fn test_days_overdue_and_fine_scenario() {
        let today = d("2024-01-10");
        assert_eq!(days_overdue("2024-01-01", today), 9);
        assert_eq!(overdue_fine("2024-01-01", today, DEFAULT_DAILY_FINE), 18.0);
    }

    #[test]
    fn test_fine_is_days_times_rate() {
        let today = d("2024-06-30");
        for due in ["2024-06-29", "2024-06-01", "2024-01-01", "2024-07-04"] {
            let expected = days_overdue(due, today) as f64 * 2.0;
            assert_eq!(FinePolicy::default().fine_for(due, today), expected);
        }
    }

    #[test]
    fn test_fine_is_uncapped() {
        let today = d("2024-01-01");
        assert_eq!(overdue_fine("2023-01-01", today, 2.0), 730.0);
    }

    #[test]
    fn test_business_day_renewal_skips_weekend() {
        // Due Thursday: Fri, Mon, Tue, Wed, Thu
        assert_eq!(next_renewal_due_date(d("2024-01-11")), d("2024-01-18"));
        // Due Monday: no weekend crossed until the following Monday
        assert_eq!(next_renewal_due_date(d("2024-01-08")), d("2024-01-15"));
    }

    #[test]
    fn test_business_day_renewal_custom_length() {
        let policy = BusinessDayRenewal { days: 10 };
        assert_eq!(policy.name(), "business_days");
        // Fri 2024-01-05 + 10 weekdays
        assert_eq!(policy.next_due_date(d("2024-01-05")), d("2024-01-19"));
    }
}
