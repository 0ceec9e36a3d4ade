//! Decoded message and its MIME parts.

use chrono::{DateTime, FixedOffset};

use super::address::EmailAddress;

/// Subject used when the header is missing, empty or undecodable.
pub const NO_SUBJECT: &str = "No Subject";

/// Server-side identifier of a message within a folder (an IMAP UID).
pub type MessageUid = u32;

/// `Content-Disposition` of a MIME part, reduced to what selection needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Attachment,
    Inline,
    /// No disposition header.
    Unspecified,
}

/// One leaf part of a decoded message, in document order.
#[derive(Debug, Clone)]
pub struct MessagePart {
    /// Decoded filename from `Content-Disposition` or `Content-Type`, if any.
    pub filename: Option<String>,
    pub disposition: Disposition,
    /// MIME type, e.g. `"application/pdf"`.
    pub content_type: String,
    /// `true` for decoded `text/plain` and `text/html` parts.
    pub is_body_text: bool,
    /// Transfer-decoded payload.
    pub payload: Vec<u8>,
}

/// One fetched and decoded message.
///
/// Built by a [`Decoder`](crate::parser::Decoder), consumed once by the
/// folder processor.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    /// Protocol identifier the message was fetched with.
    pub uid: MessageUid,
    /// Filesystem-safe id derived from `Message-ID`, or `email_{uid}`.
    pub correlation_id: String,
    pub sender: EmailAddress,
    /// Decoded subject; never empty (see [`NO_SUBJECT`]).
    pub subject: String,
    /// Parsed `Date:` header, if any.
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub parts: Vec<MessagePart>,
}

/// An attachment-like part selected for filtering.
#[derive(Debug, Clone)]
pub struct CandidatePart {
    /// Decoded filename; synthesized as `attachment_{n}` when missing.
    pub filename: String,
    pub content_type: String,
    pub payload: Vec<u8>,
}

impl CandidatePart {
    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }
}
