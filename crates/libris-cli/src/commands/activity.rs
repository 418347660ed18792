//! Activity log commands

use anyhow::Result;
use clap::Subcommand;
use libris_core::{ActivityEntry, ActivityLog};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_error, print_output, print_success};
use super::helpers::truncate;
use super::Context;

#[derive(Subcommand)]
pub enum ActivityAction {
    /// Show recent actions, newest first
    List {
        /// Maximum number of entries
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Forget all recorded actions
    Clear {
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Serialize, Tabled)]
pub struct ActivityRow {
    #[tabled(rename = "When")]
    pub when: String,
    #[tabled(rename = "Action")]
    pub action: String,
    #[tabled(rename = "Detail")]
    pub detail: String,
}

impl From<&ActivityEntry> for ActivityRow {
    fn from(entry: &ActivityEntry) -> Self {
        Self {
            when: entry
                .timestamp
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            action: entry.action.clone(),
            detail: truncate(&entry.detail, 60),
        }
    }
}

pub async fn execute(ctx: &Context, action: ActivityAction) -> Result<()> {
    let mut log = ActivityLog::open_default()?;

    match action {
        ActivityAction::List { limit } => {
            let rows: Vec<ActivityRow> = log.recent(limit).iter().map(ActivityRow::from).collect();
            print_output(&rows, ctx.format)
        }
        ActivityAction::Clear { force } => {
            if !force {
                print_error(&format!(
                    "This removes {} entries. Use --force to confirm",
                    log.entries().len()
                ));
                return Ok(());
            }
            log.clear()?;
            print_success("Activity log cleared", ctx.quiet);
            Ok(())
        }
    }
}
