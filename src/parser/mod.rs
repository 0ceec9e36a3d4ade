//! Turning fetched bytes into [`MessageRecord`]s.

pub mod header;
pub mod mime;

pub use mime::MailParserDecoder;

use crate::error::Result;
use crate::model::message::{MessageRecord, MessageUid};

/// Decodes one raw RFC 5322 message.
///
/// Fails with [`MalformedMessage`](crate::error::ExtractError::MalformedMessage)
/// on empty or headerless input. Undecodable header values degrade to
/// placeholders instead of failing.
pub trait Decoder {
    fn parse(&self, uid: MessageUid, raw: &[u8]) -> Result<MessageRecord>;
}
