//! Processing of a single folder.

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::limits::Reservation;
use super::{layout, select, Progress, RunContext};
use crate::error::ExtractError;
use crate::model::attachment::SavedAttachment;
use crate::model::message::MessageRecord;
use crate::model::report::{FolderReport, FolderStats};
use crate::storage::unique_path;
use crate::transport::Folder;

/// Fetch failures in a row after which the session is presumed dead.
pub const MAX_CONSECUTIVE_FETCH_FAILURES: u32 = 5;

/// What one folder produced.
#[derive(Debug, Clone)]
pub struct FolderOutcome {
    pub report: FolderReport,
    pub attachments: Vec<SavedAttachment>,
}

/// Search `folder`, then fetch, decode and save attachments message by
/// message until the ids or the budget run out.
///
/// Failures of individual messages and attachments are recorded in the
/// report; only a failed search or a dead session stops the folder early.
pub fn process_folder(folder: &mut dyn Folder, ctx: &mut RunContext<'_>) -> FolderOutcome {
    let name = folder.name().to_string();
    let mut stats = FolderStats::default();
    let mut attachments = Vec::new();

    ctx.limits.enter_folder();

    let uids = match folder.search(&ctx.options.search_criteria) {
        Ok(uids) => uids,
        Err(e) => {
            warn!(folder = %name, error = %e, "Search failed");
            stats.record_error(format!("search failed: {e}"));
            return FolderOutcome {
                report: stats.finish(&name),
                attachments,
            };
        }
    };
    stats.messages_seen = uids.len() as u64;
    info!(folder = %name, messages = uids.len(), "Processing folder");

    let mut consecutive_failures = 0;
    for (position, &uid) in uids.iter().enumerate() {
        match ctx.limits.try_reserve() {
            Reservation::Granted => {}
            Reservation::FolderExhausted | Reservation::GlobalExhausted => {
                info!(folder = %name, processed = position, "Message limit reached");
                stats.limit_reached = true;
                break;
            }
        }

        match folder.fetch(uid) {
            Ok(raw) => {
                consecutive_failures = 0;
                match ctx.decoder.parse(uid, &raw) {
                    Ok(message) => {
                        stats.messages_processed += 1;
                        save_attachments(&name, &message, ctx, &mut stats, &mut attachments);
                    }
                    Err(e) => {
                        warn!(folder = %name, uid, error = %e, "Could not decode message");
                        stats.messages_failed += 1;
                        stats.record_error(format!("UID {uid}: {e}"));
                    }
                }
            }
            Err(e) => {
                warn!(folder = %name, uid, error = %e, "Fetch failed");
                stats.messages_failed += 1;
                stats.record_error(format!("UID {uid}: {e}"));
                consecutive_failures += 1;
                if consecutive_failures >= MAX_CONSECUTIVE_FETCH_FAILURES {
                    let abandon = ExtractError::Transport(format!(
                        "{consecutive_failures} consecutive fetch failures, folder abandoned"
                    ));
                    warn!(folder = %name, "{abandon}");
                    stats.record_error(abandon);
                    break;
                }
            }
        }

        let progress = Progress {
            folder: name.clone(),
            position: position + 1,
            total: uids.len(),
            uid,
            attachments_saved: stats.attachments_saved,
        };
        if !(ctx.progress)(&progress) {
            info!(folder = %name, "Cancelled");
            ctx.cancelled = true;
            break;
        }
    }

    debug!(
        folder = %name,
        saved = stats.attachments_saved,
        rejected = stats.attachments_rejected,
        "Folder done"
    );

    FolderOutcome {
        report: stats.finish(&name),
        attachments,
    }
}

/// Filter, number and write the attachments of one message.
fn save_attachments(
    folder_name: &str,
    message: &MessageRecord,
    ctx: &mut RunContext<'_>,
    stats: &mut FolderStats,
    saved: &mut Vec<SavedAttachment>,
) {
    let candidates = select::select(message);
    if candidates.is_empty() {
        debug!(uid = message.uid, "No attachments");
        return;
    }

    let dir = layout::placement_for(
        folder_name,
        message,
        ctx.options.organize_by_sender,
        ctx.options.organize_by_date,
    );
    let message_folder = layout::message_folder_name(message);
    let mut sequence = 0u32;
    let mut dir_ready = false;

    for candidate in candidates {
        let clean_name = layout::sanitize_file_name(&candidate.filename);
        let decision = ctx.filter.classify(&clean_name);
        if !decision.is_accepted() {
            debug!(uid = message.uid, file = %candidate.filename, reason = %decision.reason(), "Skipping");
            stats.attachments_rejected += 1;
            continue;
        }

        sequence += 1;

        if !dir_ready {
            if let Err(e) = ctx.storage.ensure_directory(&dir) {
                warn!(path = %dir.display(), error = %e, "Cannot create directory");
                stats.attachments_failed += 1;
                stats.record_error(format!("UID {}: {e}", message.uid));
                continue;
            }
            dir_ready = true;
        }

        let file_name = layout::attachment_file_name(sequence, &clean_name);
        let path = unique_path(&*ctx.storage, &dir, &file_name);

        if let Err(e) = ctx.storage.write(&path, &candidate.payload) {
            warn!(path = %path.display(), error = %e, "Cannot write attachment");
            stats.attachments_failed += 1;
            stats.record_error(format!("UID {}: {e}", message.uid));
            continue;
        }

        let size = candidate.size();
        stats.attachments_saved += 1;
        stats.bytes_written += size;
        debug!(uid = message.uid, path = %path.display(), size, "Saved attachment");

        saved.push(SavedAttachment {
            filename: path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or(file_name),
            original_filename: candidate.filename,
            relative_path: layout::display_path(&path),
            size_bytes: size,
            sha256: format!("{:x}", Sha256::digest(&candidate.payload)),
            sequence,
            sender: message.sender.display(),
            subject: message.subject.clone(),
            date: message.timestamp,
            correlation_id: message.correlation_id.clone(),
            uid: message.uid,
            mailbox: folder_name.to_string(),
            message_folder: message_folder.clone(),
        });
    }
}
