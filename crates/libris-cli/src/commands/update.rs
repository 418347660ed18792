//! Update commands
//!
//! Compare the install directory with the configured GitHub branch and
//! rebuild from source when it is behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Subcommand;
use libris_core::services::updater::{short_sha, StepOutcome};
use libris_core::services::{apply_update, default_steps, UpdateChecker, UpdateStatus};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_info, print_output, print_success, print_warning, OutputFormat};
use super::helpers::truncate;
use super::Context;

#[derive(Subcommand)]
pub enum UpdateAction {
    /// Check whether a newer commit is available
    Check,

    /// Pull and rebuild in the install directory
    Apply {
        /// Run even when already up to date
        #[arg(long)]
        force: bool,
    },

    /// Poll until an update appears (Ctrl-C to stop)
    Watch {
        /// Seconds between checks
        #[arg(short, long, default_value = "300")]
        interval: u64,
    },
}

#[derive(Debug, Serialize, Tabled)]
pub struct StepRow {
    #[tabled(rename = "Step")]
    pub name: String,
    #[tabled(rename = "Result")]
    pub result: String,
    #[tabled(rename = "Output")]
    pub output: String,
}

impl From<&StepOutcome> for StepRow {
    fn from(outcome: &StepOutcome) -> Self {
        // Last line is usually the interesting one
        let last = outcome.output.lines().last().unwrap_or("");
        Self {
            name: outcome.name.clone(),
            result: if outcome.success { "ok" } else { "failed" }.to_string(),
            output: truncate(last, 60),
        }
    }
}

pub async fn execute(ctx: &Context, action: UpdateAction) -> Result<()> {
    let checker = UpdateChecker::new(ctx.config.update_settings()?)?;

    match action {
        UpdateAction::Check => {
            let status = checker.check().await?;
            print_status(ctx, &status)
        }
        UpdateAction::Apply { force } => apply(ctx, &checker, force).await,
        UpdateAction::Watch { interval } => watch(ctx, &checker, interval).await,
    }
}

fn print_status(ctx: &Context, status: &UpdateStatus) -> Result<()> {
    if ctx.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(status)?);
    } else if status.update_available {
        print_success(
            &format!(
                "Update available: {} -> {}",
                short_sha(&status.local),
                short_sha(&status.remote)
            ),
            ctx.quiet,
        );
    } else {
        print_info(&format!("Up to date ({})", short_sha(&status.local)), ctx.quiet);
    }
    Ok(())
}

async fn apply(ctx: &Context, checker: &UpdateChecker, force: bool) -> Result<()> {
    let status = checker.check().await?;
    if !status.update_available && !force {
        print_info(&format!("Already up to date ({})", short_sha(&status.local)), ctx.quiet);
        return Ok(());
    }

    let dir = checker.settings().install_dir.clone();
    print_info(&format!("Updating {}...", dir.display()), ctx.hide_notes());
    let outcomes = tokio::task::spawn_blocking(move || apply_update(&dir, &default_steps())).await?;

    let rows: Vec<StepRow> = outcomes.iter().map(StepRow::from).collect();
    print_output(&rows, ctx.format)?;

    if let Some(failed) = outcomes.iter().find(|o| !o.success) {
        anyhow::bail!("Update step '{}' failed:\n{}", failed.name, failed.output);
    }

    ctx.record_activity(
        "update.apply",
        format!("{} -> {}", short_sha(&status.local), short_sha(&status.remote)),
    );
    print_success("Update installed; restart libris to use it", ctx.quiet);
    Ok(())
}

async fn watch(ctx: &Context, checker: &UpdateChecker, interval: u64) -> Result<()> {
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_signal = Arc::clone(&cancel);
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_signal.store(true, Ordering::SeqCst);
        }
    });

    print_info(
        &format!("Checking every {}s, Ctrl-C to stop", interval.max(1)),
        ctx.hide_notes(),
    );
    let found = checker
        .poll(Duration::from_secs(interval.max(1)), &cancel)
        .await;
    watcher.abort();

    match found? {
        Some(status) => print_status(ctx, &status),
        None => {
            print_warning("Stopped watching", ctx.quiet);
            Ok(())
        }
    }
}
