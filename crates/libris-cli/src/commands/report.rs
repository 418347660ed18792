//! Report commands
//!
//! Monthly circulation figures for a year, shown as a table or exported to
//! an Excel workbook.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Datelike;
use clap::Subcommand;
use libris_core::dates::{format_raw_date, today};
use libris_core::services::report::loans_in_month;
use libris_core::services::{monthly_report, MonthlyStat, ReportWorkbook};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_output, print_success, OutputFormat};
use super::dashboard::collect_summary;
use super::helpers::truncate;
use super::Context;

#[derive(Subcommand)]
pub enum ReportAction {
    /// Borrowed, returned and overdue counts per month
    Monthly {
        /// Report year, defaults to the current year
        #[arg(short, long)]
        year: Option<i32>,

        /// Also write an Excel workbook to this path
        #[arg(long)]
        xlsx: Option<PathBuf>,

        /// Add a sheet listing loans borrowed in this month (1-12)
        #[arg(long, requires = "xlsx", value_parser = clap::value_parser!(u32).range(1..=12))]
        loans_month: Option<u32>,

        /// Add the dashboard summary sheet to the workbook
        #[arg(long, requires = "xlsx")]
        summary: bool,
    },

    /// Loans borrowed in one month
    Loans {
        #[arg(short, long)]
        year: Option<i32>,

        /// Month (1-12)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },
}

#[derive(Debug, Serialize, Tabled)]
pub struct MonthRow {
    #[tabled(rename = "Month")]
    pub month: String,
    #[tabled(rename = "Borrowed")]
    pub borrowed: usize,
    #[tabled(rename = "Returned")]
    pub returned: usize,
    #[tabled(rename = "Overdue")]
    pub overdue: usize,
    #[tabled(rename = "Processed")]
    pub processed: usize,
}

impl From<&MonthlyStat> for MonthRow {
    fn from(stat: &MonthlyStat) -> Self {
        Self {
            month: stat.label.clone(),
            borrowed: stat.borrowed,
            returned: stat.returned,
            overdue: stat.overdue,
            processed: stat.processed,
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub struct MonthLoanRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Borrower")]
    pub borrower: String,
    #[tabled(rename = "Book")]
    pub book: String,
    #[tabled(rename = "Borrowed")]
    pub borrowed: String,
    #[tabled(rename = "Returned")]
    pub returned: String,
}

pub async fn execute(ctx: &Context, action: ReportAction) -> Result<()> {
    match action {
        ReportAction::Monthly { year, xlsx, loans_month, summary } => {
            monthly(ctx, year, xlsx, loans_month, summary).await
        }
        ReportAction::Loans { year, month } => month_loans(ctx, year, month).await,
    }
}

async fn monthly(
    ctx: &Context,
    year: Option<i32>,
    xlsx: Option<PathBuf>,
    loans_month: Option<u32>,
    with_summary: bool,
) -> Result<()> {
    let today = today();
    let year = year.unwrap_or_else(|| today.year());

    log::info!("Building monthly report for {}", year);
    let records = ctx.client()?.fetch_all_borrows().await?;
    let report = monthly_report(&records, year, today);

    match &xlsx {
        None => {
            if ctx.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let mut rows: Vec<MonthRow> = report.months.iter().map(MonthRow::from).collect();
                rows.push(MonthRow::from(&report.totals));
                print_output(&rows, ctx.format)?;
            }
        }
        Some(path) => {
            let mut workbook = ReportWorkbook::new();
            workbook.add_monthly_sheet(&report)?;

            if let Some(month) = loans_month {
                let loans = loans_in_month(&records, year, month);
                workbook.add_loans_sheet(&format!("Loans {}-{:02}", year, month), &loans)?;
            }
            if with_summary {
                let summary = collect_summary(ctx).await?;
                workbook.add_summary_sheet(&summary)?;
            }

            workbook.save(path)?;
            ctx.record_activity("report.export", path.display().to_string());
            print_success(&format!("Report saved to {}", path.display()), ctx.quiet);
        }
    }
    Ok(())
}

async fn month_loans(ctx: &Context, year: Option<i32>, month: u32) -> Result<()> {
    let year = year.unwrap_or_else(|| today().year());
    let records = ctx.client()?.fetch_all_borrows().await?;

    let rows: Vec<MonthLoanRow> = loans_in_month(&records, year, month)
        .into_iter()
        .map(|r| MonthLoanRow {
            id: r.id,
            borrower: r
                .student_name
                .clone()
                .unwrap_or_else(|| format!("#{}", r.student_id)),
            book: r
                .book_title
                .as_deref()
                .map(|t| truncate(t, 40))
                .unwrap_or_else(|| format!("#{}", r.book_id)),
            borrowed: format_raw_date(Some(&r.borrowed_date)),
            returned: format_raw_date(r.returned_date.as_deref()),
        })
        .collect();
    print_output(&rows, ctx.format)
}
