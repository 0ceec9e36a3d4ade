//! Per-folder statistics and the run-wide report.

use chrono::{DateTime, Utc};

use super::attachment::SavedAttachment;

/// Running counters for one folder, owned by the folder processor while it
/// works. Turned into a [`FolderReport`] by [`FolderStats::finish`].
#[derive(Debug, Default)]
pub struct FolderStats {
    /// Message ids returned by the search.
    pub messages_seen: u64,
    /// Messages fetched and decoded.
    pub messages_processed: u64,
    /// Messages whose fetch or decode failed.
    pub messages_failed: u64,
    pub attachments_saved: u64,
    /// Candidates turned down by the include/exclude patterns.
    pub attachments_rejected: u64,
    /// Accepted candidates that could not be written.
    pub attachments_failed: u64,
    pub bytes_written: u64,
    pub errors: Vec<String>,
    /// Set when the folder or global budget stopped the folder early.
    pub limit_reached: bool,
}

impl FolderStats {
    pub fn record_error(&mut self, error: impl std::fmt::Display) {
        self.errors.push(error.to_string());
    }

    /// Freeze the counters into an immutable snapshot.
    pub fn finish(self, mailbox: &str) -> FolderReport {
        FolderReport {
            mailbox: mailbox.to_string(),
            messages_seen: self.messages_seen,
            messages_processed: self.messages_processed,
            messages_failed: self.messages_failed,
            attachments_saved: self.attachments_saved,
            attachments_rejected: self.attachments_rejected,
            attachments_failed: self.attachments_failed,
            bytes_written: self.bytes_written,
            errors: self.errors,
            limit_reached: self.limit_reached,
        }
    }
}

/// Final statistics of one folder.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FolderReport {
    pub mailbox: String,
    pub messages_seen: u64,
    pub messages_processed: u64,
    pub messages_failed: u64,
    pub attachments_saved: u64,
    pub attachments_rejected: u64,
    pub attachments_failed: u64,
    pub bytes_written: u64,
    pub errors: Vec<String>,
    pub limit_reached: bool,
}

/// Aggregate counters over every folder of a run.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunTotals {
    pub messages_processed: u64,
    pub attachments_saved: u64,
    pub total_bytes: u64,
    pub errors: Vec<String>,
}

/// Everything a run produced. This is the document persisted as
/// `attachments_metadata_total.json`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunReport {
    pub extraction_date: DateTime<Utc>,
    /// Folders that were opened, in processing order.
    pub processed_folders: Vec<String>,
    /// Folders left untouched because the global limit ran out or the run
    /// was cancelled.
    pub skipped_folders: Vec<String>,
    pub statistics: RunTotals,
    pub folders: Vec<FolderReport>,
    pub attachments: Vec<SavedAttachment>,
    pub cancelled: bool,
    pub dry_run: bool,
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            extraction_date: Utc::now(),
            processed_folders: Vec::new(),
            skipped_folders: Vec::new(),
            statistics: RunTotals::default(),
            folders: Vec::new(),
            attachments: Vec::new(),
            cancelled: false,
            dry_run,
        }
    }

    /// Fold one finished folder into the totals.
    ///
    /// `opened` is false for folders that failed before any message could be
    /// searched; they still contribute their errors.
    pub fn merge_folder(
        &mut self,
        folder: FolderReport,
        attachments: Vec<SavedAttachment>,
        opened: bool,
    ) {
        debug_assert_eq!(folder.attachments_saved, attachments.len() as u64);

        if opened {
            self.processed_folders.push(folder.mailbox.clone());
        }
        self.statistics.messages_processed += folder.messages_processed;
        self.statistics.attachments_saved += folder.attachments_saved;
        self.statistics.total_bytes += folder.bytes_written;
        self.statistics
            .errors
            .extend(folder.errors.iter().map(|e| format!("{}: {e}", folder.mailbox)));
        self.attachments.extend(attachments);
        self.folders.push(folder);
    }

    /// Record an error that does not belong to a single folder.
    pub fn record_error(&mut self, error: impl std::fmt::Display) {
        self.statistics.errors.push(error.to_string());
    }

    pub fn skip_folder(&mut self, mailbox: &str) {
        self.skipped_folders.push(mailbox.to_string());
    }
}
