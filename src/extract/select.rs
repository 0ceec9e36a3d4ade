//! Picking the attachment-like parts of a message.

use crate::model::message::{CandidatePart, Disposition, MessagePart, MessageRecord};

/// Whether a part is treated as an attachment.
///
/// Anything marked `attachment`, plus any other part that carries a
/// filename (inline images and the like). Body text without a filename is
/// never selected.
pub fn is_candidate(part: &MessagePart) -> bool {
    part.disposition == Disposition::Attachment || part.filename.is_some()
}

/// Attachment candidates of `message`, in message order.
///
/// Missing filenames become `attachment_{n}`, `n` counting candidates from
/// zero. No name-based filtering happens here.
pub fn select(message: &MessageRecord) -> Vec<CandidatePart> {
    message
        .parts
        .iter()
        .filter(|p| is_candidate(p))
        .enumerate()
        .map(|(index, part)| CandidatePart {
            filename: part
                .filename
                .clone()
                .unwrap_or_else(|| format!("attachment_{index}")),
            content_type: part.content_type.clone(),
            payload: part.payload.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::address::EmailAddress;

    fn part(filename: Option<&str>, disposition: Disposition, body: bool) -> MessagePart {
        MessagePart {
            filename: filename.map(str::to_string),
            disposition,
            content_type: if body { "text/plain" } else { "application/octet-stream" }.into(),
            is_body_text: body,
            payload: b"data".to_vec(),
        }
    }

    fn message(parts: Vec<MessagePart>) -> MessageRecord {
        MessageRecord {
            uid: 1,
            correlation_id: "c".into(),
            sender: EmailAddress::default(),
            subject: "s".into(),
            timestamp: None,
            parts,
        }
    }

    #[test]
    fn test_select_skips_body_and_keeps_order() {
        let msg = message(vec![
            part(None, Disposition::Unspecified, true),
            part(Some("b.pdf"), Disposition::Attachment, false),
            part(Some("logo.png"), Disposition::Inline, false),
            part(None, Disposition::Inline, true),
            part(Some("a.doc"), Disposition::Unspecified, false),
        ]);
        let names: Vec<String> = select(&msg).into_iter().map(|c| c.filename).collect();
        assert_eq!(names, vec!["b.pdf", "logo.png", "a.doc"]);
    }

    #[test]
    fn test_select_synthesizes_missing_names() {
        let msg = message(vec![
            part(Some("first.txt"), Disposition::Attachment, true),
            part(None, Disposition::Attachment, false),
        ]);
        let candidates = select(&msg);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].filename, "attachment_1");
        assert_eq!(candidates[1].size(), 4);
    }

    #[test]
    fn test_no_candidates() {
        let msg = message(vec![part(None, Disposition::Unspecified, true)]);
        assert!(select(&msg).is_empty());
    }
}
