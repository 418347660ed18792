//! Borrow query commands

use anyhow::Result;
use libris_core::dates::{format_raw_date, today};
use libris_core::models::BorrowRecord;
use libris_core::services::overdue_loans;
use serde::Serialize;

use crate::commands::helpers::or_dash;
use crate::commands::Context;
use crate::output::{print_details, print_info, print_output};
use super::types::LoanRow;

pub async fn list_loans(
    ctx: &Context,
    search: Option<String>,
    page: u32,
    all: bool,
    active: bool,
) -> Result<()> {
    let client = ctx.client()?;

    let mut loans = if all {
        client
            .fetch_all::<BorrowRecord>(libris_core::client::BORROW_PATH, search.as_deref())
            .await?
    } else {
        let result = client.list_borrows(page, search.as_deref()).await?;
        if result.next.is_some() {
            print_info(
                &format!("Showing page {} ({} loans in total); use --page or --all for more", page, result.count),
                ctx.hide_notes(),
            );
        }
        result.results
    };

    if active {
        loans.retain(|l| !l.is_returned);
    }

    let rules = ctx.circulation();
    let today = today();
    let rows: Vec<LoanRow> = loans.iter().map(|l| LoanRow::new(l, &rules, today)).collect();
    print_output(&rows, ctx.format)
}

/// Loan plus derived state, for JSON output
#[derive(Serialize)]
struct LoanDetails<'a> {
    #[serde(flatten)]
    record: &'a BorrowRecord,
    state: String,
    days_overdue: i64,
    outstanding_fine: f64,
    can_return: bool,
    can_renew: bool,
    can_pay: bool,
}

pub async fn show_loan(ctx: &Context, id: i64) -> Result<()> {
    let record = ctx.client()?.get_borrow(id).await?;
    let rules = ctx.circulation();
    let today = today();

    let state = rules.state(&record, today);
    let actions = rules.available_actions(&record, today);
    let details = LoanDetails {
        record: &record,
        state: state.to_string(),
        days_overdue: libris_core::services::overdue::days_overdue(&record.due_date, today),
        outstanding_fine: rules.outstanding_fine(&record, today),
        can_return: actions.can_return,
        can_renew: actions.can_renew,
        can_pay: actions.can_pay,
    };

    let mut allowed = Vec::new();
    if actions.can_return {
        allowed.push("return");
    }
    if actions.can_renew {
        allowed.push("renew");
    }
    if actions.can_pay {
        allowed.push("pay");
    }

    let fields = [
        ("ID", record.id.to_string()),
        (
            "Borrower",
            record
                .student_name
                .clone()
                .unwrap_or_else(|| format!("#{}", record.student_id)),
        ),
        (
            "Book",
            record
                .book_title
                .clone()
                .unwrap_or_else(|| format!("#{}", record.book_id)),
        ),
        ("Borrowed", format_raw_date(Some(&record.borrowed_date))),
        ("Due", format_raw_date(Some(&record.due_date))),
        ("Returned", format_raw_date(record.returned_date.as_deref())),
        ("Renewals", format!("{}/{}", record.renewed_count, rules.max_renewals())),
        ("State", state.to_string()),
        ("Days overdue", details.days_overdue.to_string()),
        ("Fine", format!("{:.2}", rules.accrued_fine(&record, today))),
        ("OR number", or_dash(record.or_number.as_deref())),
        (
            "Actions",
            if allowed.is_empty() { "-".to_string() } else { allowed.join(", ") },
        ),
    ];
    print_details(&fields, &details, ctx.format)
}

pub async fn list_overdue(ctx: &Context) -> Result<()> {
    let loans = ctx.client()?.fetch_all_borrows().await?;
    let rules = ctx.circulation();
    let today = today();

    let overdue = overdue_loans(&loans, today);
    let owed: f64 = overdue.iter().map(|l| rules.outstanding_fine(l, today)).sum();

    let rows: Vec<LoanRow> = overdue.iter().map(|l| LoanRow::new(l, &rules, today)).collect();
    print_output(&rows, ctx.format)?;
    print_info(
        &format!("{} overdue loans, {:.2} in unpaid fines", overdue.len(), owed),
        ctx.hide_notes(),
    );
    Ok(())
}
