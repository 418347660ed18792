//! Borrow mutation commands

use anyhow::Result;
use libris_core::dates::{add_business_days, format_raw_date, to_api_date, today};
use libris_core::models::NewBorrow;
use libris_core::services::days_overdue;

use crate::commands::helpers::parse_date_arg;
use crate::commands::Context;
use crate::output::{print_single, print_success};
use super::types::LoanRow;

pub async fn create_loan(
    ctx: &Context,
    student: i64,
    book: i64,
    days: Option<u32>,
    due: Option<String>,
) -> Result<()> {
    let today = today();
    let due_date = match due {
        Some(raw) => parse_date_arg(&raw)?,
        None => add_business_days(today, days.unwrap_or(ctx.config.renewal_days)),
    };
    if due_date < today {
        anyhow::bail!("Due date {} is in the past", to_api_date(due_date));
    }

    let request = NewBorrow {
        student_id: student,
        book_id: book,
        borrowed_date: to_api_date(today),
        due_date: to_api_date(due_date),
    };
    let record = ctx.client()?.create_borrow(&request).await?;

    ctx.record_activity(
        "borrow.create",
        format!("loan #{}: book #{} to student #{}", record.id, book, student),
    );
    print_success(
        &format!("Created loan #{} due {}", record.id, format_raw_date(Some(&record.due_date))),
        ctx.quiet,
    );
    if !ctx.quiet {
        print_single(&LoanRow::new(&record, &ctx.circulation(), today), ctx.format)?;
    }
    Ok(())
}

pub async fn return_loan(ctx: &Context, id: i64, or_number: Option<String>) -> Result<()> {
    let today = today();
    let rules = ctx.circulation();
    let record = rules
        .return_loan(&ctx.client()?, id, today, or_number.as_deref())
        .await?;

    let detail = match &or_number {
        Some(or) => format!("loan #{} (OR {})", id, or),
        None => format!("loan #{}", id),
    };
    ctx.record_activity("borrow.return", detail);
    print_success(&format!("Returned loan #{}", id), ctx.quiet);
    if !ctx.quiet {
        print_single(&LoanRow::new(&record, &rules, today), ctx.format)?;
    }
    Ok(())
}

pub async fn renew_loan(ctx: &Context, id: i64, or_number: Option<String>) -> Result<()> {
    let today = today();
    let rules = ctx.circulation();
    let record = rules
        .renew_loan(&ctx.client()?, id, today, or_number.as_deref())
        .await?;

    ctx.record_activity(
        "borrow.renew",
        format!("loan #{} until {}", id, record.due_date),
    );
    print_success(
        &format!(
            "Renewed loan #{} until {} ({}/{} renewals)",
            id,
            format_raw_date(Some(&record.due_date)),
            record.renewed_count,
            rules.max_renewals()
        ),
        ctx.quiet,
    );
    if !ctx.quiet {
        print_single(&LoanRow::new(&record, &rules, today), ctx.format)?;
    }
    Ok(())
}

pub async fn pay_fine(ctx: &Context, id: i64, or_number: String) -> Result<()> {
    let today = today();
    let rules = ctx.circulation();
    let record = rules.pay_fine(&ctx.client()?, id, today, &or_number).await?;

    // The paid record still carries the due date the fine was computed from
    let amount = rules.accrued_fine(&record, today);
    ctx.record_activity(
        "borrow.pay",
        format!("loan #{}: {:.2} (OR {})", id, amount, or_number.trim()),
    );
    print_success(
        &format!(
            "Recorded payment of {:.2} for loan #{} ({} days overdue)",
            amount,
            id,
            days_overdue(&record.due_date, today)
        ),
        ctx.quiet,
    );
    if !ctx.quiet {
        print_single(&LoanRow::new(&record, &rules, today), ctx.format)?;
    }
    Ok(())
}
