//! Circulation services

pub mod catalog;
pub mod circulation;
pub mod import;
pub mod overdue;
pub mod report;
pub mod updater;

pub use catalog::{copy_label, expand_variants, split_identifiers, validate_new_book, CopyIdentifiers};
pub use circulation::{
    overdue_loans, AvailableActions, Circulation, LoanActionError, LoanState,
};
pub use import::{
    parse_books_csv, parse_students_csv, run_import, BookRow, ImportProgress, ImportSink,
    ImportSummary, RowFailure,
};
pub use overdue::{
    days_overdue, is_overdue, next_renewal_due_date, overdue_fine, BusinessDayRenewal,
    FinePolicy, RenewalPolicy, MAX_LOAN_DAYS,
};
pub use report::{
    dashboard_summary, monthly_report, DashboardSummary, MonthlyReport, MonthlyStat,
    ReportWorkbook,
};
pub use updater::{apply_update, default_steps, UpdateChecker, UpdateSettings, UpdateStatus};
