//! Circulation reports
//!
//! Monthly activity for a year and the dashboard summary, both computed
//! locally from full record lists.

mod excel;

pub use excel::ReportWorkbook;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::dates::{month_bounds, parse_date};
use crate::models::{Book, BookStatus, BorrowRecord};
use crate::services::overdue::{is_overdue, FinePolicy};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Counts for one month
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonthlyStat {
    /// 1..=12
    pub month: u32,
    pub label: String,
    pub borrowed: usize,
    pub returned: usize,
    pub overdue: usize,
    /// Borrowed plus returned
    pub processed: usize,
}

impl MonthlyStat {
    fn add(&mut self, other: &MonthlyStat) {
        self.borrowed += other.borrowed;
        self.returned += other.returned;
        self.overdue += other.overdue;
        self.processed += other.processed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub months: Vec<MonthlyStat>,
    pub totals: MonthlyStat,
}

/// Build the twelve-month report for `year`.
///
/// A loan counts as overdue in the month it fell due if it came back late
/// or is still out past its due date as of `today`.
pub fn monthly_report(records: &[BorrowRecord], year: i32, today: NaiveDate) -> MonthlyReport {
    let mut months: Vec<MonthlyStat> = (1..=12u32)
        .map(|m| MonthlyStat {
            month: m,
            label: MONTH_LABELS[(m - 1) as usize].to_string(),
            ..Default::default()
        })
        .collect();

    let slot = |date: NaiveDate| -> Option<usize> {
        (date.year() == year).then(|| date.month0() as usize)
    };

    for record in records {
        if let Some(i) = parse_date(&record.borrowed_date).and_then(slot) {
            months[i].borrowed += 1;
        }
        let returned = record.returned_date.as_deref().and_then(parse_date);
        if let Some(i) = returned.and_then(slot) {
            months[i].returned += 1;
        }
        if let Some(due) = parse_date(&record.due_date) {
            if let Some(i) = slot(due) {
                let late = match returned {
                    Some(back) => back > due,
                    None => !record.is_returned && is_overdue(&record.due_date, today),
                };
                if late {
                    months[i].overdue += 1;
                }
            }
        }
    }

    let mut totals = MonthlyStat {
        label: "Total".to_string(),
        ..Default::default()
    };
    for stat in months.iter_mut() {
        stat.processed = stat.borrowed + stat.returned;
        totals.add(stat);
    }

    MonthlyReport { year, months, totals }
}

/// Loans borrowed within one calendar month
pub fn loans_in_month(records: &[BorrowRecord], year: i32, month: u32) -> Vec<&BorrowRecord> {
    let Some((first, last)) = month_bounds(year, month) else {
        return Vec::new();
    };
    records
        .iter()
        .filter(|r| {
            parse_date(&r.borrowed_date)
                .map(|d| d >= first && d <= last)
                .unwrap_or(false)
        })
        .collect()
}

/// Books in one status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: BookStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_books: usize,
    pub books_by_status: Vec<StatusCount>,
    pub active_loans: usize,
    pub overdue_loans: usize,
    /// Fines accrued on overdue loans not yet paid
    pub outstanding_fines: f64,
    pub total_students: Option<u64>,
    pub total_staff: Option<u64>,
}

/// Summarize the catalog and open loans
pub fn dashboard_summary(
    books: &[Book],
    borrows: &[BorrowRecord],
    fines: &FinePolicy,
    today: NaiveDate,
) -> DashboardSummary {
    let books_by_status = BookStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: books.iter().filter(|b| b.status == *status).count(),
        })
        .collect();

    let open: Vec<&BorrowRecord> = borrows.iter().filter(|r| !r.is_returned).collect();
    let overdue: Vec<&&BorrowRecord> = open
        .iter()
        .filter(|r| is_overdue(&r.due_date, today))
        .collect();
    let outstanding_fines = overdue
        .iter()
        .filter(|r| !r.paid)
        .map(|r| fines.fine_for(&r.due_date, today))
        .sum();

    DashboardSummary {
        total_books: books.len(),
        books_by_status,
        active_loans: open.len(),
        overdue_loans: overdue.len(),
        outstanding_fines,
        total_students: None,
        total_staff: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn loan(borrowed: &str, due: &str, returned: Option<&str>) -> BorrowRecord {
        BorrowRecord {
            id: 1,
            student_id: 1,
            book_id: 1,
            borrowed_date: borrowed.to_string(),
            due_date: due.to_string(),
            returned_date: returned.map(String::from),
            is_returned: returned.is_some(),
            paid: false,
            renewed_count: 0,
            or_number: None,
            student_name: None,
            book_title: None,
        }
    }

    fn book(status: BookStatus) -> Book {
        Book {
            id: 1,
            title: "T".to_string(),
            author: "A".to_string(),
            isbn: None,
            accession_number: None,
            call_number: None,
            copies: 1,
            copy_number: None,
            status,
            publisher: None,
            year: None,
            barcode: None,
            edition: None,
            subject: None,
        }
    }

    #[test]
    fn test_monthly_report_counts() {
        let records = vec![
            // Returned on time in January
            loan("2024-01-02", "2024-01-09", Some("2024-01-08")),
            // Returned late, in February
            loan("2024-01-25", "2024-01-31", Some("2024-02-03")),
            // Still out, due in March, now past due
            loan("2024-03-01", "2024-03-08", None),
            // Previous year, ignored
            loan("2023-12-20", "2023-12-27", Some("2023-12-26")),
            // Unparseable dates are ignored
            loan("garbage", "", None),
        ];
        let report = monthly_report(&records, 2024, d("2024-04-01"));

        assert_eq!(report.months.len(), 12);
        let jan = &report.months[0];
        assert_eq!((jan.borrowed, jan.returned, jan.overdue, jan.processed), (2, 1, 1, 3));
        let feb = &report.months[1];
        assert_eq!((feb.borrowed, feb.returned, feb.overdue), (0, 1, 0));
        let mar = &report.months[2];
        assert_eq!((mar.borrowed, mar.overdue), (1, 1));

        assert_eq!(report.totals.label, "Total");
        assert_eq!(report.totals.borrowed, 3);
        assert_eq!(report.totals.returned, 2);
        assert_eq!(report.totals.overdue, 2);
        assert_eq!(report.totals.processed, 5);
    }

    #[test]
    fn test_monthly_report_open_loan_not_yet_due() {
        let records = vec![loan("2024-03-01", "2024-03-08", None)];
        let report = monthly_report(&records, 2024, d("2024-03-05"));
        assert_eq!(report.months[2].overdue, 0);
    }

    #[test]
    fn test_loans_in_month() {
        let records = vec![
            loan("2024-02-01", "2024-02-08", None),
            loan("2024-02-29", "2024-03-07", None),
            loan("2024-03-01", "2024-03-08", None),
        ];
        assert_eq!(loans_in_month(&records, 2024, 2).len(), 2);
        assert!(loans_in_month(&records, 2024, 13).is_empty());
    }

    #[test]
    fn test_dashboard_summary() {
        let books = vec![
            book(BookStatus::Available),
            book(BookStatus::Available),
            book(BookStatus::Borrowed),
            book(BookStatus::Lost),
        ];
        let mut paid = loan("2024-01-01", "2024-01-05", None);
        paid.paid = true;
        let borrows = vec![
            loan("2024-01-01", "2024-01-08", None),
            paid,
            loan("2024-01-09", "2024-01-20", None),
            loan("2024-01-01", "2024-01-02", Some("2024-01-02")),
        ];

        let summary = dashboard_summary(&books, &borrows, &FinePolicy::default(), d("2024-01-10"));

        assert_eq!(summary.total_books, 4);
        let available = summary
            .books_by_status
            .iter()
            .find(|s| s.status == BookStatus::Available)
            .unwrap();
        assert_eq!(available.count, 2);
        assert_eq!(summary.active_loans, 3);
        assert_eq!(summary.overdue_loans, 2);
        // Only the unpaid loan accrues: 2 days at 2.0
        assert_eq!(summary.outstanding_fines, 4.0);
    }
}
