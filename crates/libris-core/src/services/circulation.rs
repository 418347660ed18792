//! Borrow lifecycle: state derivation and return/renew/pay actions
//!
//! A loan moves through
//!
//! ```text
//! Borrowed ──► Overdue(unpaid) ──► Overdue(paid)
//!    │  ▲            │  │               │
//!    │  └── renew ───┘  │               │
//!    └───── return ─────┴──── return ───┴──► Returned (terminal)
//! ```
//!
//! Every action is validated here before anything is sent to the API. The
//! `plan_*` functions produce the request body; the `apply_*` functions project
//! the same change onto a local copy of the record.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::client::ApiClient;
use crate::dates::{parse_date, to_api_date};
use crate::error::Result;
use crate::models::{BorrowRecord, PaymentRequest, RenewRequest, ReturnRequest, MAX_RENEWALS};
use crate::services::overdue::{days_overdue, is_overdue, BusinessDayRenewal, FinePolicy, RenewalPolicy};

/// Why an action was refused client-side
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoanActionError {
    #[error("Loan has already been returned")]
    AlreadyReturned,

    #[error("Renewal limit reached ({count} of {max} renewals used)")]
    RenewalLimitReached { count: u32, max: u32 },

    #[error("Overdue fine for this loan has already been paid")]
    AlreadyPaid,

    #[error("Loan is not overdue; there is no fine to pay")]
    NotOverdue,

    #[error("An OR number is required to record a payment")]
    MissingReceipt,

    #[error("Loan has an invalid due date: {0}")]
    InvalidDueDate(String),
}

/// Derived lifecycle state of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoanState {
    Borrowed,
    Overdue { paid: bool },
    Returned,
}

impl LoanState {
    pub fn label(&self) -> &'static str {
        match self {
            LoanState::Borrowed => "Borrowed",
            LoanState::Overdue { paid: false } => "Overdue",
            LoanState::Overdue { paid: true } => "Overdue (paid)",
            LoanState::Returned => "Returned",
        }
    }
}

impl std::fmt::Display for LoanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which actions the UI should enable for a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AvailableActions {
    pub can_return: bool,
    pub can_renew: bool,
    pub can_pay: bool,
}

/// Circulation rules: fine rate, renewal policy and renewal cap
pub struct Circulation {
    fines: FinePolicy,
    renewal: Box<dyn RenewalPolicy>,
    max_renewals: u32,
}

impl Default for Circulation {
    fn default() -> Self {
        Self::new(FinePolicy::default(), Box::new(BusinessDayRenewal::default()))
    }
}

impl Circulation {
    pub fn new(fines: FinePolicy, renewal: Box<dyn RenewalPolicy>) -> Self {
        Self {
            fines,
            renewal,
            max_renewals: MAX_RENEWALS,
        }
    }

    /// Lower the renewal cap. Values above [`MAX_RENEWALS`] are clamped.
    pub fn with_max_renewals(mut self, max: u32) -> Self {
        self.max_renewals = max.min(MAX_RENEWALS);
        self
    }

    pub fn fines(&self) -> FinePolicy {
        self.fines
    }

    pub fn renewal_policy(&self) -> &dyn RenewalPolicy {
        self.renewal.as_ref()
    }

    pub fn max_renewals(&self) -> u32 {
        self.max_renewals
    }

    pub fn state(&self, record: &BorrowRecord, today: NaiveDate) -> LoanState {
        if record.is_returned {
            LoanState::Returned
        } else if is_overdue(&record.due_date, today) {
            LoanState::Overdue { paid: record.paid }
        } else {
            LoanState::Borrowed
        }
    }

    /// Fine accrued on the loan regardless of payment status
    pub fn accrued_fine(&self, record: &BorrowRecord, today: NaiveDate) -> f64 {
        if record.is_returned {
            return 0.0;
        }
        self.fines.fine_for(&record.due_date, today)
    }

    /// Fine still owed: zero unless the loan is overdue and unpaid
    pub fn outstanding_fine(&self, record: &BorrowRecord, today: NaiveDate) -> f64 {
        match self.state(record, today) {
            LoanState::Overdue { paid: false } => self.accrued_fine(record, today),
            _ => 0.0,
        }
    }

    pub fn available_actions(&self, record: &BorrowRecord, today: NaiveDate) -> AvailableActions {
        AvailableActions {
            can_return: self.check_return(record).is_ok(),
            can_renew: self.check_renew(record, today).is_ok(),
            can_pay: self.check_payment(record, today).is_ok(),
        }
    }

    fn check_return(&self, record: &BorrowRecord) -> std::result::Result<(), LoanActionError> {
        if record.is_returned {
            return Err(LoanActionError::AlreadyReturned);
        }
        Ok(())
    }

    fn check_renew(
        &self,
        record: &BorrowRecord,
        today: NaiveDate,
    ) -> std::result::Result<(), LoanActionError> {
        match self.state(record, today) {
            LoanState::Returned => Err(LoanActionError::AlreadyReturned),
            _ if record.renewed_count >= self.max_renewals => {
                Err(LoanActionError::RenewalLimitReached {
                    count: record.renewed_count,
                    max: self.max_renewals,
                })
            }
            LoanState::Overdue { paid: true } => Err(LoanActionError::AlreadyPaid),
            _ => Ok(()),
        }
    }

    fn check_payment(
        &self,
        record: &BorrowRecord,
        today: NaiveDate,
    ) -> std::result::Result<(), LoanActionError> {
        match self.state(record, today) {
            LoanState::Returned => Err(LoanActionError::AlreadyReturned),
            LoanState::Borrowed => Err(LoanActionError::NotOverdue),
            LoanState::Overdue { paid: true } => Err(LoanActionError::AlreadyPaid),
            LoanState::Overdue { paid: false } => Ok(()),
        }
    }

    /// Build a payment for the current overdue cycle
    pub fn plan_payment(
        &self,
        record: &BorrowRecord,
        today: NaiveDate,
        or_number: &str,
    ) -> std::result::Result<PaymentRequest, LoanActionError> {
        self.check_payment(record, today)?;
        let or_number = or_number.trim();
        if or_number.is_empty() {
            return Err(LoanActionError::MissingReceipt);
        }
        let days = days_overdue(&record.due_date, today);
        Ok(PaymentRequest {
            or_number: or_number.to_string(),
            amount: days as f64 * self.fines.daily_rate,
            days_overdue: days,
        })
    }

    /// Build a return, optionally settling the fine in the same step
    pub fn plan_return(
        &self,
        record: &BorrowRecord,
        today: NaiveDate,
        or_number: Option<&str>,
    ) -> std::result::Result<ReturnRequest, LoanActionError> {
        self.check_return(record)?;
        let payment = or_number
            .map(|or| self.plan_payment(record, today, or))
            .transpose()?;
        Ok(ReturnRequest {
            returned_date: to_api_date(today),
            payment,
        })
    }

    /// Build a renewal, optionally settling the fine first.
    ///
    /// The new period runs from the later of the old due date and `today`,
    /// so a renewed loan is never already overdue.
    pub fn plan_renew(
        &self,
        record: &BorrowRecord,
        today: NaiveDate,
        or_number: Option<&str>,
    ) -> std::result::Result<RenewRequest, LoanActionError> {
        self.check_renew(record, today)?;
        let current_due = parse_date(&record.due_date)
            .ok_or_else(|| LoanActionError::InvalidDueDate(record.due_date.clone()))?;
        let payment = or_number
            .map(|or| self.plan_payment(record, today, or))
            .transpose()?;
        let base = current_due.max(today);
        Ok(RenewRequest {
            due_date: to_api_date(self.renewal.next_due_date(base)),
            renewed_count: record.renewed_count + 1,
            payment,
        })
    }

    /// Project a return onto a local copy of the record
    pub fn apply_return(&self, record: &BorrowRecord, request: &ReturnRequest) -> BorrowRecord {
        let mut next = record.clone();
        if let Some(payment) = &request.payment {
            apply_payment_fields(&mut next, payment);
        }
        next.is_returned = true;
        next.returned_date = Some(request.returned_date.clone());
        next
    }

    /// Project a renewal onto a local copy. The renewed loan starts a fresh
    /// fine cycle, so `paid` is cleared.
    pub fn apply_renew(&self, record: &BorrowRecord, request: &RenewRequest) -> BorrowRecord {
        let mut next = record.clone();
        if let Some(payment) = &request.payment {
            apply_payment_fields(&mut next, payment);
        }
        next.due_date = request.due_date.clone();
        next.renewed_count = request.renewed_count;
        next.paid = false;
        next
    }

    pub fn apply_payment(&self, record: &BorrowRecord, payment: &PaymentRequest) -> BorrowRecord {
        let mut next = record.clone();
        apply_payment_fields(&mut next, payment);
        next
    }

    // ── Remote actions ─────────────────────────────────────────

    /// Validate locally, then return the loan through the API
    pub async fn return_loan(
        &self,
        api: &ApiClient,
        id: i64,
        today: NaiveDate,
        or_number: Option<&str>,
    ) -> Result<BorrowRecord> {
        let record = api.get_borrow(id).await?;
        let request = self.plan_return(&record, today, or_number)?;
        log::info!("Returning loan {} (payment: {})", id, request.payment.is_some());
        api.return_borrow(id, &request).await
    }

    /// Validate locally, then renew the loan through the API
    pub async fn renew_loan(
        &self,
        api: &ApiClient,
        id: i64,
        today: NaiveDate,
        or_number: Option<&str>,
    ) -> Result<BorrowRecord> {
        let record = api.get_borrow(id).await?;
        let request = self.plan_renew(&record, today, or_number)?;
        log::info!(
            "Renewing loan {} until {} ({}/{})",
            id,
            request.due_date,
            request.renewed_count,
            self.max_renewals
        );
        api.renew_borrow(id, &request).await
    }

    /// Validate locally, then record an overdue payment through the API
    pub async fn pay_fine(
        &self,
        api: &ApiClient,
        id: i64,
        today: NaiveDate,
        or_number: &str,
    ) -> Result<BorrowRecord> {
        let record = api.get_borrow(id).await?;
        let payment = self.plan_payment(&record, today, or_number)?;
        log::info!("Recording payment of {:.2} for loan {}", payment.amount, id);
        api.pay_borrow(id, &payment).await
    }
}

fn apply_payment_fields(record: &mut BorrowRecord, payment: &PaymentRequest) {
    record.paid = true;
    record.or_number = Some(payment.or_number.clone());
}

/// Loans that are out and past due, oldest due date first
pub fn overdue_loans<'a>(records: &'a [BorrowRecord], today: NaiveDate) -> Vec<&'a BorrowRecord> {
    let mut overdue: Vec<&BorrowRecord> = records
        .iter()
        .filter(|r| !r.is_returned && is_overdue(&r.due_date, today))
        .collect();
    overdue.sort_by_key(|r| parse_date(&r.due_date));
    overdue
}
