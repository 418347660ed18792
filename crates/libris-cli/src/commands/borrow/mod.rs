//! Borrow commands
//!
//! Lending, returns, renewals and overdue payments. Every action is checked
//! against the loan's current state before the API is called.

mod actions;
mod queries;
mod types;

use anyhow::Result;

use crate::commands::Context;

pub use types::BorrowAction;

pub async fn execute(ctx: &Context, action: BorrowAction) -> Result<()> {
    match action {
        BorrowAction::List { search, page, all, active } => {
            queries::list_loans(ctx, search, page, all, active).await
        }
        BorrowAction::Show { id } => queries::show_loan(ctx, id).await,
        BorrowAction::Overdue => queries::list_overdue(ctx).await,
        BorrowAction::Create { student, book, days, due } => {
            actions::create_loan(ctx, student, book, days, due).await
        }
        BorrowAction::Return { id, or_number } => {
            actions::return_loan(ctx, id, or_number).await
        }
        BorrowAction::Renew { id, or_number } => {
            actions::renew_loan(ctx, id, or_number).await
        }
        BorrowAction::Pay { id, or_number } => actions::pay_fine(ctx, id, or_number).await,
    }
}
