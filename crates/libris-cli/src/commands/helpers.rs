//! Helpers shared across commands

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use libris_core::services::import::{run_import, ImportSink, ImportSummary};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_info, print_output, print_success, print_warning};
use super::Context;

/// Truncate string to max characters (UTF-8 safe)
pub fn truncate(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = chars[..max_chars.saturating_sub(3)].iter().collect();
        format!("{}...", truncated)
    }
}

/// Parse a date argument; `today` is accepted
pub fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    if s.trim().eq_ignore_ascii_case("today") {
        return Ok(libris_core::dates::today());
    }
    libris_core::dates::parse_date(s)
        .ok_or_else(|| anyhow::anyhow!("Invalid date: {}. Use YYYY-MM-DD", s))
}

pub fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

pub fn read_csv_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

#[derive(Debug, Serialize, Tabled)]
pub struct FailureRow {
    #[tabled(rename = "Row")]
    pub row: usize,
    #[tabled(rename = "Label")]
    pub label: String,
    #[tabled(rename = "Error")]
    pub message: String,
}

/// Upload parsed rows with a progress line; Ctrl-C stops after the row in
/// flight.
pub async fn run_cli_import<T, S>(
    ctx: &Context,
    items: &[T],
    sink: &S,
    label: impl Fn(&T) -> String,
) -> Result<ImportSummary>
where
    T: Send + Sync,
    S: ImportSink<T>,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_signal = Arc::clone(&cancel);
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_signal.store(true, Ordering::SeqCst);
        }
    });

    let quiet = ctx.quiet;
    let summary = run_import(items, sink, &cancel, |p| {
        if !quiet {
            eprint!("\rImporting {}/{} ({} failed)", p.current, p.total, p.failed);
            let _ = std::io::stderr().flush();
        }
    })
    .await;
    watcher.abort();
    if !quiet && summary.attempted() > 0 {
        eprintln!();
    }

    if summary.cancelled {
        print_warning(
            &format!(
                "Import cancelled: {} rows not attempted",
                summary.skipped
            ),
            ctx.quiet,
        );
    }
    print_success(
        &format!(
            "Imported {}/{} rows ({} failed)",
            summary.succeeded,
            summary.total,
            summary.failed()
        ),
        ctx.quiet,
    );

    if !summary.failures.is_empty() {
        let rows: Vec<FailureRow> = summary
            .failures
            .iter()
            .map(|f| FailureRow {
                row: f.row,
                label: items.get(f.row - 1).map(&label).unwrap_or_default(),
                message: f.message.clone(),
            })
            .collect();
        print_info("Failed rows:", ctx.quiet);
        print_output(&rows, ctx.format)?;
    }

    Ok(summary)
}
