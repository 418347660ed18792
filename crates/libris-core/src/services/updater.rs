//! Update checker and self-updater
//!
//! Compares the local checkout's HEAD with the newest commit on a GitHub
//! branch, and can rebuild the install directory in place by running a fixed
//! list of commands. There is no rollback: a failed step leaves the checkout
//! as that step left it.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::header;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const GITHUB_API: &str = "https://api.github.com";

/// Cancellation is checked this often while waiting between polls
const POLL_SLICE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSettings {
    /// `owner/name`
    pub repo: String,
    pub branch: String,
    pub install_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
    pub local: String,
    pub remote: String,
    pub update_available: bool,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
}

pub struct UpdateChecker {
    client: reqwest::Client,
    api_base: String,
    settings: UpdateSettings,
}

impl UpdateChecker {
    pub fn new(settings: UpdateSettings) -> Result<Self> {
        if !settings.repo.contains('/') {
            return Err(Error::config(format!(
                "Update repository must look like owner/name, got '{}'",
                settings.repo
            )));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        // GitHub rejects requests without a user agent
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(concat!("libris/", env!("CARGO_PKG_VERSION"))),
        );
        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            api_base: GITHUB_API.to_string(),
            settings,
        })
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn settings(&self) -> &UpdateSettings {
        &self.settings
    }

    /// SHA of the newest commit on the configured branch
    pub async fn remote_commit(&self) -> Result<String> {
        let url = format!(
            "{}/repos/{}/commits/{}",
            self.api_base, self.settings.repo, self.settings.branch
        );
        log::debug!("Checking {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = crate::client::error_message(&body)
                .unwrap_or_else(|| format!("GitHub returned HTTP {}", status));
            return Err(Error::Api { status, message });
        }

        let commit: CommitResponse = response.json().await?;
        Ok(commit.sha)
    }

    /// HEAD of the install directory
    pub fn local_commit(&self) -> Result<String> {
        local_commit(&self.settings.install_dir)
    }

    pub async fn check(&self) -> Result<UpdateStatus> {
        let local = self.local_commit()?;
        self.check_against(&local).await
    }

    /// Compare a known local SHA with the remote branch
    pub async fn check_against(&self, local: &str) -> Result<UpdateStatus> {
        let remote = self.remote_commit().await?;
        let update_available = !remote.eq_ignore_ascii_case(local.trim());
        log::info!(
            "Local {} / remote {}: {}",
            short_sha(local),
            short_sha(&remote),
            if update_available { "update available" } else { "up to date" }
        );
        Ok(UpdateStatus {
            local: local.trim().to_string(),
            remote,
            update_available,
        })
    }

    /// Check repeatedly until an update shows up or `cancel` is set.
    ///
    /// Returns `None` when cancelled. Failed checks are logged and retried on
    /// the next tick.
    pub async fn poll(&self, interval: Duration, cancel: &AtomicBool) -> Result<Option<UpdateStatus>> {
        let local = self.local_commit()?;
        Ok(self.poll_from(&local, interval, cancel).await)
    }

    /// [`poll`](Self::poll) against a known local SHA
    pub async fn poll_from(&self, local: &str, interval: Duration, cancel: &AtomicBool) -> Option<UpdateStatus> {
        loop {
            if cancel.load(Ordering::SeqCst) {
                log::info!("Update polling cancelled");
                return None;
            }

            match self.check_against(local).await {
                Ok(status) if status.update_available => return Some(status),
                Ok(_) => {}
                Err(e) => log::warn!("Update check failed: {}", e),
            }

            let mut waited = Duration::ZERO;
            while waited < interval {
                if cancel.load(Ordering::SeqCst) {
                    break;
                }
                let slice = POLL_SLICE.min(interval - waited);
                tokio::time::sleep(slice).await;
                waited += slice;
            }
        }
    }
}

/// `program args..` run inside `dir`. Git must fail instead of waiting on
/// a credential prompt nobody will answer.
fn command_in<S: AsRef<std::ffi::OsStr>>(dir: &Path, program: &str, args: &[S]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(dir).env("GIT_TERMINAL_PROMPT", "0");
    cmd
}

/// `git rev-parse HEAD` in `dir`
pub fn local_commit(dir: &Path) -> Result<String> {
    let output = command_in(dir, "git", &["rev-parse", "HEAD"]).output()?;

    if !output.status.success() {
        return Err(Error::internal(format!(
            "git rev-parse failed in {}: {}",
            dir.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

pub fn short_sha(sha: &str) -> &str {
    let sha = sha.trim();
    sha.get(..7).unwrap_or(sha)
}

/// One external command in the update sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStep {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl UpdateStep {
    pub fn new(name: &str, program: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub name: String,
    pub success: bool,
    /// Combined stdout and stderr, trimmed
    pub output: String,
}

/// Pull the latest source and rebuild
pub fn default_steps() -> Vec<UpdateStep> {
    vec![
        UpdateStep::new("pull", "git", &["pull", "--ff-only"]),
        UpdateStep::new("build", "cargo", &["build", "--release"]),
    ]
}

/// Run `steps` in `dir`, stopping at the first failure.
///
/// A step that cannot be spawned counts as failed. The returned list ends
/// with the failing step, if any.
pub fn apply_update(dir: &Path, steps: &[UpdateStep]) -> Vec<StepOutcome> {
    let mut outcomes = Vec::new();

    for step in steps {
        log::info!("Update step '{}': {} {}", step.name, step.program, step.args.join(" "));
        let outcome = match command_in(dir, &step.program, step.args.as_slice()).output() {
            Ok(output) => {
                let mut text = String::from_utf8_lossy(&output.stdout).to_string();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                StepOutcome {
                    name: step.name.clone(),
                    success: output.status.success(),
                    output: text.trim().to_string(),
                }
            }
            Err(e) => StepOutcome {
                name: step.name.clone(),
                success: false,
                output: format!("failed to start {}: {}", step.program, e),
            },
        };

        let failed = !outcome.success;
        if failed {
            log::warn!("Update step '{}' failed: {}", step.name, outcome.output);
        }
        outcomes.push(outcome);
        if failed {
            break;
        }
    }

    outcomes
}
