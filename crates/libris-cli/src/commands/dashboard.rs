//! Dashboard command
//!
//! Server counters plus a summary computed from the full book and loan lists.

use anyhow::Result;
use clap::Args;
use libris_core::dates::today;
use libris_core::services::{dashboard_summary, DashboardSummary};
use libris_core::models::DashboardStats;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_details, print_output, OutputFormat};
use super::Context;

#[derive(Args)]
pub struct DashboardArgs {
    /// Only the server counters; skips downloading every book and loan
    #[arg(long)]
    pub quick: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Books")]
    count: usize,
}

#[derive(Serialize)]
struct DashboardOutput {
    stats: DashboardStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<DashboardSummary>,
}

/// Fetch everything the local summary needs
pub async fn collect_summary(ctx: &Context) -> Result<DashboardSummary> {
    let client = ctx.client()?;
    let books = client.fetch_all_books().await?;
    let borrows = client.fetch_all_borrows().await?;
    log::debug!("Summarizing {} books and {} loans", books.len(), borrows.len());

    let mut summary = dashboard_summary(&books, &borrows, &ctx.config.fine_policy(), today());
    summary.total_students = Some(client.list_students(1, None).await?.count);
    summary.total_staff = Some(client.list_staff(1, None).await?.count);
    Ok(summary)
}

pub async fn execute(ctx: &Context, args: DashboardArgs) -> Result<()> {
    let stats = ctx.client()?.dashboard_stats().await?;
    let summary = if args.quick {
        None
    } else {
        Some(collect_summary(ctx).await?)
    };

    if ctx.format == OutputFormat::Json {
        let output = DashboardOutput { stats, summary };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let mut fields = vec![
        ("Books", stats.total_books.to_string()),
        ("Students", stats.total_students.to_string()),
        ("Staff", stats.total_staff.to_string()),
        ("Borrowed today", stats.borrowed_today.to_string()),
        ("Returned today", stats.returned_today.to_string()),
    ];
    if let Some(summary) = &summary {
        fields.push(("Active loans", summary.active_loans.to_string()));
        fields.push(("Overdue loans", summary.overdue_loans.to_string()));
        fields.push(("Unpaid fines", format!("{:.2}", summary.outstanding_fines)));
    }
    print_details(&fields, &stats, ctx.format)?;

    if let Some(summary) = summary {
        println!();
        let rows: Vec<StatusRow> = summary
            .books_by_status
            .iter()
            .map(|s| StatusRow {
                status: s.status.to_string(),
                count: s.count,
            })
            .collect();
        print_output(&rows, ctx.format)?;
    }
    Ok(())
}
