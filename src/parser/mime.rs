//! MIME decoding of fetched messages with `mail-parser`.

use mail_parser::{MessageParser, MimeHeaders, PartType};
use tracing::debug;

use super::header::{correlation_id, has_headers, parse_date, raw_header};
use super::Decoder;
use crate::error::{ExtractError, Result};
use crate::model::address::EmailAddress;
use crate::model::message::{Disposition, MessagePart, MessageRecord, MessageUid, NO_SUBJECT};

/// [`Decoder`] backed by `mail-parser`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MailParserDecoder;

impl MailParserDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for MailParserDecoder {
    fn parse(&self, uid: MessageUid, raw: &[u8]) -> Result<MessageRecord> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(ExtractError::MalformedMessage(format!("UID {uid}: empty message")));
        }
        if !has_headers(raw) {
            return Err(ExtractError::MalformedMessage(format!("UID {uid}: no header block")));
        }

        let msg = MessageParser::default().parse(raw).ok_or_else(|| {
            ExtractError::MalformedMessage(format!("UID {uid}: not an RFC 5322 message"))
        })?;

        let sender = msg
            .from()
            .and_then(|from| from.first())
            .map(|addr| EmailAddress::new(addr.name().unwrap_or(""), addr.address().unwrap_or("")))
            .filter(|addr| !addr.address.is_empty())
            .or_else(|| raw_header(raw, "from").map(|v| EmailAddress::parse(&v)))
            .unwrap_or_default();

        let subject = msg
            .subject()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| NO_SUBJECT.to_string());

        let timestamp = msg
            .date()
            .and_then(|d| parse_date(&d.to_rfc3339()))
            .or_else(|| raw_header(raw, "date").and_then(|v| parse_date(&v)));

        let message_id = msg
            .message_id()
            .map(str::to_string)
            .or_else(|| raw_header(raw, "message-id"));

        let parts: Vec<MessagePart> = msg.parts.iter().filter_map(leaf_part).collect();

        debug!(uid, parts = parts.len(), "Decoded message");

        Ok(MessageRecord {
            uid,
            correlation_id: correlation_id(message_id.as_deref(), uid),
            sender,
            subject,
            timestamp,
            parts,
        })
    }
}

/// Convert one `mail-parser` part; multipart containers yield `None`.
fn leaf_part(part: &mail_parser::MessagePart<'_>) -> Option<MessagePart> {
    if matches!(part.body, PartType::Multipart(_)) {
        return None;
    }

    let disposition = match part.content_disposition() {
        Some(d) if d.ctype().eq_ignore_ascii_case("attachment") => Disposition::Attachment,
        Some(d) if d.ctype().eq_ignore_ascii_case("inline") => Disposition::Inline,
        _ => Disposition::Unspecified,
    };

    let content_type = part
        .content_type()
        .map(|ct| match ct.subtype() {
            Some(sub) => format!("{}/{sub}", ct.ctype()),
            None => ct.ctype().to_string(),
        })
        .map(|ct| ct.to_lowercase())
        .unwrap_or_else(|| "text/plain".to_string());

    let filename = part
        .attachment_name()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    Some(MessagePart {
        filename,
        disposition,
        content_type,
        is_body_text: matches!(part.body, PartType::Text(_) | PartType::Html(_)),
        payload: part.contents().to_vec(),
    })
}
