//! Borrow command types

use chrono::NaiveDate;
use clap::Subcommand;
use libris_core::dates::format_raw_date;
use libris_core::models::BorrowRecord;
use libris_core::services::MAX_LOAN_DAYS;
use libris_core::Circulation;
use serde::Serialize;
use tabled::Tabled;

use crate::commands::helpers::truncate;

#[derive(Subcommand)]
pub enum BorrowAction {
    /// List loans
    List {
        /// Search borrower or title
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Fetch every page
        #[arg(long)]
        all: bool,

        /// Hide returned loans
        #[arg(long)]
        active: bool,
    },

    /// Show a loan and the actions it allows
    Show {
        /// Loan ID
        id: i64,
    },

    /// Loans past their due date, oldest first
    Overdue,

    /// Lend a book to a student
    Create {
        /// Student ID
        #[arg(short, long)]
        student: i64,

        /// Book ID
        #[arg(short, long)]
        book: i64,

        /// Loan length in business days (defaults to the renewal length)
        #[arg(
            long,
            conflicts_with = "due",
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_LOAN_DAYS))
        )]
        days: Option<u32>,

        /// Explicit due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// Return a loan, settling any fine when an OR number is given
    Return {
        id: i64,

        /// Official receipt number for the overdue fine
        #[arg(long = "or")]
        or_number: Option<String>,
    },

    /// Renew a loan, settling any fine when an OR number is given
    Renew {
        id: i64,

        #[arg(long = "or")]
        or_number: Option<String>,
    },

    /// Record payment of an overdue fine
    Pay {
        id: i64,

        /// Official receipt number
        #[arg(long = "or")]
        or_number: String,
    },
}

/// Loan row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct LoanRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Borrower")]
    pub borrower: String,
    #[tabled(rename = "Book")]
    pub book: String,
    #[tabled(rename = "Borrowed")]
    pub borrowed: String,
    #[tabled(rename = "Due")]
    pub due: String,
    #[tabled(rename = "Renewals")]
    pub renewals: String,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Fine")]
    pub fine: String,
}

impl LoanRow {
    pub fn new(record: &BorrowRecord, rules: &Circulation, today: NaiveDate) -> Self {
        let borrower = record
            .student_name
            .clone()
            .unwrap_or_else(|| format!("#{}", record.student_id));
        let book = record
            .book_title
            .as_deref()
            .map(|t| truncate(t, 32))
            .unwrap_or_else(|| format!("#{}", record.book_id));
        let fine = rules.accrued_fine(record, today);

        Self {
            id: record.id,
            borrower: truncate(&borrower, 24),
            book,
            borrowed: format_raw_date(Some(&record.borrowed_date)),
            due: format_raw_date(Some(&record.due_date)),
            renewals: format!("{}/{}", record.renewed_count, rules.max_renewals()),
            state: rules.state(record, today).to_string(),
            fine: if fine > 0.0 { format!("{:.2}", fine) } else { "-".to_string() },
        }
    }
}
