//! Record of an attachment written to storage.

use chrono::{DateTime, FixedOffset};

use super::message::MessageUid;

/// Metadata about one saved attachment, as it appears in the inventory.
///
/// Created once the payload is on disk; never modified afterwards.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SavedAttachment {
    /// Final file name, e.g. `"01_report.pdf"` (or `"01_report_1.pdf"` after a collision).
    pub filename: String,

    /// Filename as decoded from the message, before sanitization.
    pub original_filename: String,

    /// Path of the file relative to the output root, `/`-separated.
    pub relative_path: String,

    /// Number of bytes written.
    pub size_bytes: u64,

    /// Hex-encoded SHA-256 of the payload.
    pub sha256: String,

    /// Position among the accepted attachments of the message (1-based).
    pub sequence: u32,

    /// Sender as `"Name <address>"`.
    pub sender: String,

    pub subject: String,

    /// Message `Date:` header, if it could be parsed.
    pub date: Option<DateTime<FixedOffset>>,

    pub correlation_id: String,

    /// UID of the message in its mailbox.
    pub uid: MessageUid,

    /// Mailbox folder the message was found in.
    pub mailbox: String,

    /// Name of the per-message directory holding the file.
    pub message_folder: String,
}
