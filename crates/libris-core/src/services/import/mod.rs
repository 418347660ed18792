//! CSV import pipeline
//!
//! Parse a delimited file into validated rows, then upload the rows one at a
//! time. Parsing is all-or-nothing: a parse error aborts before anything is
//! sent. Uploading is at-least-attempt-all: a failed row is logged and
//! counted, and the loop moves on. A cancellation flag is checked before each
//! row; the request already in flight always completes.

pub mod books;
pub mod students;

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Serialize;

use crate::client::ApiClient;
use crate::error::Result;
use crate::models::{NewBook, NewStudent};

pub use books::{parse_books_csv, BookRow};
pub use students::parse_students_csv;

/// Destination for imported rows
#[async_trait]
pub trait ImportSink<T: Send + Sync>: Send + Sync {
    async fn submit(&self, item: &T) -> Result<()>;
}

#[async_trait]
impl ImportSink<NewBook> for ApiClient {
    async fn submit(&self, item: &NewBook) -> Result<()> {
        self.create_book(item).await.map(|_| ())
    }
}

#[async_trait]
impl ImportSink<NewStudent> for ApiClient {
    async fn submit(&self, item: &NewStudent) -> Result<()> {
        self.create_student(item).await.map(|_| ())
    }
}

/// Progress after each attempted row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportProgress {
    /// 1-based position of the row just attempted
    pub current: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// One row that the server rejected
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    /// 1-based position in the parsed list
    pub row: usize,
    pub message: String,
}

/// Outcome of an import run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<RowFailure>,
    /// Rows never attempted because the run was cancelled
    pub skipped: usize,
    pub cancelled: bool,
}

impl ImportSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn attempted(&self) -> usize {
        self.succeeded + self.failures.len()
    }
}

/// Upload `items` sequentially through `sink`.
pub async fn run_import<T, S, F>(
    items: &[T],
    sink: &S,
    cancel: &AtomicBool,
    mut on_progress: F,
) -> ImportSummary
where
    T: Send + Sync,
    S: ImportSink<T> + ?Sized,
    F: FnMut(&ImportProgress),
{
    let mut summary = ImportSummary {
        total: items.len(),
        ..Default::default()
    };

    for (index, item) in items.iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            summary.cancelled = true;
            summary.skipped = items.len() - index;
            log::warn!(
                "Import cancelled after {} of {} rows ({} succeeded)",
                index,
                items.len(),
                summary.succeeded
            );
            break;
        }

        match sink.submit(item).await {
            Ok(()) => summary.succeeded += 1,
            Err(e) => {
                log::warn!("Import row {} failed: {}", index + 1, e);
                summary.failures.push(RowFailure {
                    row: index + 1,
                    message: e.to_string(),
                });
            }
        }

        on_progress(&ImportProgress {
            current: index + 1,
            total: items.len(),
            succeeded: summary.succeeded,
            failed: summary.failures.len(),
        });
    }

    log::info!(
        "Import finished: {}/{} succeeded, {} failed, {} skipped",
        summary.succeeded,
        summary.total,
        summary.failed(),
        summary.skipped
    );
    summary
}

const SNIFF_LINES: usize = 5;

/// Pick the delimiter from the first few non-empty lines: tab if any line
/// has one, semicolon if it outnumbers commas, otherwise comma.
pub fn detect_delimiter(text: &str) -> u8 {
    let (mut tabs, mut semicolons, mut commas) = (0, 0, 0);
    for line in text.lines().filter(|l| !l.trim().is_empty()).take(SNIFF_LINES) {
        tabs += line.matches('\t').count();
        semicolons += line.matches(';').count();
        commas += line.matches(',').count();
    }

    if tabs > 0 {
        b'\t'
    } else if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Trimmed cell text with any UTF-8 byte order mark removed
pub(crate) fn clean_cell(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    /// Records submissions; fails listed rows; raises the cancel flag after
    /// `cancel_after` submissions.
    struct RecordingSink {
        submitted: Mutex<Vec<u32>>,
        fail_on: Vec<u32>,
        cancel_after: Option<usize>,
        cancel: Arc<AtomicBool>,
        calls: AtomicUsize,
    }

    impl RecordingSink {
        fn new(fail_on: Vec<u32>, cancel_after: Option<usize>, cancel: Arc<AtomicBool>) -> Self {
            Self {
                submitted: Mutex::new(Vec::new()),
                fail_on,
                cancel_after,
                cancel,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ImportSink<u32> for RecordingSink {
        async fn submit(&self, item: &u32) -> Result<()> {
            let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(calls) == self.cancel_after {
                self.cancel.store(true, Ordering::SeqCst);
            }
            if self.fail_on.contains(item) {
                return Err(Error::Api {
                    status: 400,
                    message: format!("row {} rejected", item),
                });
            }
            self.submitted.lock().unwrap().push(*item);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_import_all_rows_succeed() {
        let cancel = Arc::new(AtomicBool::new(false));
        let sink = RecordingSink::new(vec![], None, cancel.clone());
        let items = vec![1, 2, 3];
        let mut progress = Vec::new();

        let summary = run_import(&items, &sink, &cancel, |p| progress.push(*p)).await;

        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed(), 0);
        assert!(!summary.cancelled);
        assert_eq!(*sink.submitted.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(progress.len(), 3);
        assert_eq!(progress[2].current, 3);
    }

    #[tokio::test]
    async fn test_run_import_failures_do_not_abort() {
        let cancel = Arc::new(AtomicBool::new(false));
        let sink = RecordingSink::new(vec![2, 4], None, cancel.clone());
        let items = vec![1, 2, 3, 4, 5];

        let summary = run_import(&items, &sink, &cancel, |_| {}).await;

        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed(), 2);
        assert_eq!(summary.failures[0].row, 2);
        assert!(summary.failures[1].message.contains("row 4 rejected"));
        assert_eq!(summary.attempted(), 5);
        assert_eq!(*sink.submitted.lock().unwrap(), vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_run_import_cancel_mid_batch() {
        let cancel = Arc::new(AtomicBool::new(false));
        let sink = RecordingSink::new(vec![], Some(2), cancel.clone());
        let items = vec![10, 20, 30, 40, 50];

        let summary = run_import(&items, &sink, &cancel, |_| {}).await;

        // The second request was in flight when the flag was raised; it completes
        assert!(summary.cancelled);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.skipped, 3);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*sink.submitted.lock().unwrap(), vec![10, 20]);
    }

    #[tokio::test]
    async fn test_run_import_cancelled_before_start() {
        let cancel = Arc::new(AtomicBool::new(true));
        let sink = RecordingSink::new(vec![], None, cancel.clone());
        let summary = run_import(&[1u32, 2], &sink, &cancel, |_| {}).await;
        assert!(summary.cancelled);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.attempted(), 0);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), b'\t');
        assert_eq!(detect_delimiter("\n\na,b,c"), b',');
        assert_eq!(detect_delimiter("a;b;c"), b';');
        assert_eq!(detect_delimiter("Title line\nx\ty\tz"), b'\t');
        assert_eq!(detect_delimiter(""), b',');
    }

    #[test]
    fn test_clean_cell() {
        assert_eq!(clean_cell("\u{feff}Call No. "), "Call No.");
    }
}
