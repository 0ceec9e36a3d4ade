//! Running the pipeline over one folder or a folder tree.

use std::collections::hash_map::{Entry, HashMap};

use tracing::{info, warn};

use super::folder::process_folder;
use super::layout::sanitize_dir_name;
use super::report::{write_folder_report, write_run_report};
use super::{RunContext, RunOptions};
use crate::error::Result;
use crate::model::message::MessageUid;
use crate::model::report::{FolderStats, RunReport};
use crate::parser::Decoder;
use crate::storage::Storage;
use crate::transport::{is_within, Transport};

/// Snapshot handed to the progress callback after each message.
#[derive(Debug, Clone)]
pub struct Progress {
    pub folder: String,
    /// 1-based position of the message within the folder's search result.
    pub position: usize,
    /// Number of search hits in the folder.
    pub total: usize,
    pub uid: MessageUid,
    /// Attachments saved in this folder so far.
    pub attachments_saved: u64,
}

/// Extract attachments according to `options`.
///
/// Returns `Err` only for fatal problems (invalid configuration, rejected
/// credentials). Everything else is recorded in the returned report; a
/// failed folder listing falls back to the configured mailbox alone.
/// `progress` returning `false` stops the run; the partial report comes
/// back with `cancelled` set.
pub fn run(
    transport: &mut dyn Transport,
    decoder: &dyn Decoder,
    storage: &mut dyn Storage,
    options: &RunOptions,
    progress: &dyn Fn(&Progress) -> bool,
) -> Result<RunReport> {
    let mut ctx = RunContext::new(options, decoder, storage, progress)?;
    let mut report = RunReport::new(options.dry_run);
    let targets = match target_folders(transport, options) {
        Ok(targets) => targets,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(mailbox = %options.mailbox, error = %e, "Cannot list folders, using the mailbox alone");
            report.record_error(format!("folder listing failed: {e}"));
            vec![options.mailbox.clone()]
        }
    };
    // Output directory → first folder that used it.
    let mut output_dirs: HashMap<String, String> = HashMap::new();

    info!(
        folders = targets.len(),
        recursive = options.recursive,
        dry_run = options.dry_run,
        "Starting extraction"
    );

    for name in &targets {
        if ctx.cancelled || ctx.limits.global_exhausted() {
            report.skip_folder(name);
            continue;
        }

        match output_dirs.entry(sanitize_dir_name(name)) {
            Entry::Occupied(entry) => {
                let (dir, first) = (entry.key(), entry.get());
                warn!(folder = %name, other = %first, dir = %dir, "Folders share an output directory");
                report.record_error(format!(
                    "{name}: output directory '{dir}' is shared with '{first}'"
                ));
            }
            Entry::Vacant(slot) => {
                slot.insert(name.clone());
            }
        }

        let mut folder = match transport.open(name) {
            Ok(folder) => folder,
            Err(e) => {
                warn!(folder = %name, error = %e, "Cannot open folder");
                let mut stats = FolderStats::default();
                stats.record_error(format!("open failed: {e}"));
                report.merge_folder(stats.finish(name), Vec::new(), false);
                continue;
            }
        };

        let outcome = process_folder(folder.as_mut(), &mut ctx);
        drop(folder);

        if options.save_metadata {
            if let Err(e) = write_folder_report(
                ctx.storage,
                report.extraction_date,
                &outcome.report,
                &outcome.attachments,
            ) {
                warn!(folder = %name, error = %e, "Cannot write folder report");
                report.record_error(format!("{name}: folder report: {e}"));
            }
        }

        report.merge_folder(outcome.report, outcome.attachments, true);
    }

    if !report.skipped_folders.is_empty() {
        info!(skipped = report.skipped_folders.len(), "Folders skipped");
    }
    report.cancelled = ctx.cancelled;

    if options.save_metadata {
        if let Err(e) = write_run_report(ctx.storage, &report) {
            warn!(error = %e, "Cannot write run report");
            report.record_error(format!("run report: {e}"));
        }
    }

    info!(
        messages = report.statistics.messages_processed,
        attachments = report.statistics.attachments_saved,
        bytes = report.statistics.total_bytes,
        errors = report.statistics.errors.len(),
        cancelled = report.cancelled,
        "Extraction finished"
    );
    Ok(report)
}

/// Folders to process, in order.
///
/// Recursive mode lists the server and keeps the configured mailbox and
/// everything below it, sorted so that parents come before children.
pub fn target_folders(transport: &mut dyn Transport, options: &RunOptions) -> Result<Vec<String>> {
    if !options.recursive {
        return Ok(vec![options.mailbox.clone()]);
    }

    let mut folders: Vec<String> = transport
        .list_folders()?
        .into_iter()
        .filter(|f| is_within(&options.mailbox, f))
        .collect();
    folders.sort();
    folders.dedup();

    if folders.is_empty() {
        warn!(mailbox = %options.mailbox, "No folder matches the mailbox");
    }
    Ok(folders)
}
