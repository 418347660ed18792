//! CLI commands module
//!
//! One submodule per top-level subcommand.

pub mod activity;
pub mod books;
pub mod borrow;
pub mod config;
pub mod dashboard;
pub mod helpers;
pub mod report;
pub mod staff;
pub mod students;
pub mod update;

use anyhow::Result;
use libris_core::{ActivityLog, ApiClient, AppConfig, Circulation};

use crate::output::OutputFormat;

/// Shared context for all commands
pub struct Context {
    pub config: AppConfig,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl Context {
    /// API client built from the effective configuration
    pub fn client(&self) -> Result<ApiClient> {
        Ok(self.config.client()?)
    }

    /// Notes are suppressed in quiet mode and when printing JSON
    pub fn hide_notes(&self) -> bool {
        self.quiet || self.format == OutputFormat::Json
    }

    pub fn circulation(&self) -> Circulation {
        self.config.circulation()
    }

    /// Record a successful mutation. Failing to write the log never fails
    /// the command.
    pub fn record_activity(&self, action: &str, detail: impl Into<String>) {
        if let Err(e) = append_activity(action, detail.into()) {
            log::warn!("Could not write activity log: {}", e);
        }
    }
}

fn append_activity(action: &str, detail: String) -> libris_core::Result<()> {
    let mut log = ActivityLog::open_default()?;
    log.record(action, detail)?;
    Ok(())
}
