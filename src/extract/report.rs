//! JSON inventories written next to the extracted files.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::layout;
use crate::error::Result;
use crate::model::attachment::SavedAttachment;
use crate::model::report::{FolderReport, RunReport};
use crate::storage::Storage;

/// Per-folder inventory, inside the folder's directory.
pub const FOLDER_REPORT_FILE: &str = "attachments_metadata.json";

/// Run inventory, at the storage root.
pub const TOTAL_REPORT_FILE: &str = "attachments_metadata_total.json";

#[derive(Serialize)]
struct FolderDocument<'a> {
    extraction_date: DateTime<Utc>,
    mailbox: &'a str,
    statistics: &'a FolderReport,
    attachments: &'a [SavedAttachment],
}

/// Write `{folder}/attachments_metadata.json`. Returns the relative path.
pub fn write_folder_report(
    storage: &mut dyn Storage,
    extraction_date: DateTime<Utc>,
    folder: &FolderReport,
    attachments: &[SavedAttachment],
) -> Result<PathBuf> {
    let dir = PathBuf::from(layout::sanitize_dir_name(&folder.mailbox));
    let doc = FolderDocument {
        extraction_date,
        mailbox: &folder.mailbox,
        statistics: folder,
        attachments,
    };
    let json = serde_json::to_vec_pretty(&doc)?;

    storage.ensure_directory(&dir)?;
    let path = dir.join(FOLDER_REPORT_FILE);
    storage.write(&path, &json)?;
    info!(path = %path.display(), attachments = attachments.len(), "Folder report written");
    Ok(path)
}

/// Write `attachments_metadata_total.json`. Returns the relative path.
pub fn write_run_report(storage: &mut dyn Storage, report: &RunReport) -> Result<PathBuf> {
    let json = serde_json::to_vec_pretty(report)?;
    let path = PathBuf::from(TOTAL_REPORT_FILE);
    storage.write(&path, &json)?;
    info!(
        path = %path.display(),
        attachments = report.attachments.len(),
        "Run report written"
    );
    Ok(path)
}
