//! Recent activity log
//!
//! Keeps the most recent actions (newest first) in a JSON file in the data
//! directory. Only successful mutations are recorded.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::data_dir;
use crate::error::Result;

/// Entries kept on disk
pub const ACTIVITY_CAPACITY: usize = 100;

const ACTIVITY_FILE: &str = "activity.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Short verb, e.g. `borrow.return`
    pub action: String,
    pub detail: String,
}

pub struct ActivityLog {
    path: PathBuf,
    capacity: usize,
    entries: Vec<ActivityEntry>,
}

impl ActivityLog {
    /// Open the log in the user data directory
    pub fn open_default() -> Result<Self> {
        Self::open(data_dir()?.join(ACTIVITY_FILE))
    }

    /// Open a log at an explicit path. A missing file is an empty log; an
    /// unreadable one is logged and replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<Vec<ActivityEntry>>(&text) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("Ignoring corrupt activity log {}: {}", path.display(), e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            capacity: ACTIVITY_CAPACITY,
            entries,
        })
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self.entries.truncate(self.capacity);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Newest first
    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    pub fn recent(&self, limit: usize) -> &[ActivityEntry] {
        &self.entries[..limit.min(self.entries.len())]
    }

    /// Append an entry and persist
    pub fn record(&mut self, action: &str, detail: impl Into<String>) -> Result<&ActivityEntry> {
        let entry = ActivityEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action: action.to_string(),
            detail: detail.into(),
        };
        log::debug!("Activity: {} {}", entry.action, entry.detail);

        self.entries.insert(0, entry);
        self.entries.truncate(self.capacity);
        self.save()?;
        Ok(&self.entries[0])
    }

    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_persists_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.json");

        let mut log = ActivityLog::open(&path).unwrap();
        log.record("book.create", "Noli Me Tangere").unwrap();
        log.record("borrow.return", "loan 12").unwrap();

        let reopened = ActivityLog::open(&path).unwrap();
        assert_eq!(reopened.entries().len(), 2);
        assert_eq!(reopened.entries()[0].action, "borrow.return");
        assert_eq!(reopened.entries()[1].detail, "Noli Me Tangere");
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ActivityLog::open(dir.path().join("a.json"))
            .unwrap()
            .with_capacity(3);
        for i in 0..5 {
            log.record("test", format!("entry {}", i)).unwrap();
        }
        let details: Vec<&str> = log.entries().iter().map(|e| e.detail.as_str()).collect();
        assert_eq!(details, vec!["entry 4", "entry 3", "entry 2"]);
    }

    #[test]
    fn test_default_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ActivityLog::open(dir.path().join("a.json")).unwrap();
        for i in 0..(ACTIVITY_CAPACITY + 5) {
            log.record("test", i.to_string()).unwrap();
        }
        assert_eq!(log.entries().len(), ACTIVITY_CAPACITY);
        assert_eq!(log.recent(2).len(), 2);
        assert_eq!(log.recent(1000).len(), ACTIVITY_CAPACITY);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.json");
        std::fs::write(&path, "[{broken").unwrap();
        let log = ActivityLog::open(&path).unwrap();
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.json");
        let mut log = ActivityLog::open(&path).unwrap();
        log.record("x", "y").unwrap();
        log.clear().unwrap();
        assert!(ActivityLog::open(&path).unwrap().entries().is_empty());
    }
}
