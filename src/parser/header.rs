//! Raw header access and the string fallbacks used when `mail-parser`
//! cannot give a decoded value: charset recovery, date parsing and
//! correlation-id derivation.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

use crate::model::message::MessageUid;

/// Longest correlation id kept in directory names.
pub const MAX_CORRELATION_ID: usize = 20;

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// The header block of a raw message: everything before the first blank line.
pub fn header_block(raw: &[u8]) -> &[u8] {
    let end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .into_iter()
        .chain(raw.windows(2).position(|w| w == b"\n\n"))
        .min()
        .unwrap_or(raw.len());
    &raw[..end]
}

/// First value of header `name` (case-insensitive), unfolded and trimmed.
///
/// Encoded-words are left as they are; callers only use this when
/// `mail-parser` produced nothing better.
pub fn raw_header(raw: &[u8], name: &str) -> Option<String> {
    let text = decode_header_bytes(header_block(raw));
    let mut found: Option<String> = None;

    for line in text.lines() {
        let continuation = line.starts_with(' ') || line.starts_with('\t');
        match (&mut found, continuation) {
            (Some(value), true) => {
                value.push(' ');
                value.push_str(line.trim());
            }
            (Some(_), false) => break,
            (None, false) => {
                if let Some((key, value)) = line.split_once(':') {
                    if key.trim().eq_ignore_ascii_case(name) {
                        found = Some(value.trim().to_string());
                    }
                }
            }
            (None, true) => {}
        }
    }

    found.filter(|v| !v.is_empty())
}

/// Whether `raw` starts with something that looks like a header line.
pub fn has_headers(raw: &[u8]) -> bool {
    let text = decode_header_bytes(header_block(raw));
    text.lines().any(|line| {
        line.split_once(':').is_some_and(|(key, _)| {
            let key = key.trim_end();
            !key.is_empty() && key.bytes().all(|b| b.is_ascii_graphic())
        })
    })
}

/// Filesystem-safe id derived from a `Message-ID` value.
///
/// Angle brackets are dropped, only the local part (before `@`) is kept,
/// filtered to `[A-Za-z0-9_-]` and cut at [`MAX_CORRELATION_ID`] chars.
/// Falls back to `email_{uid}` when nothing usable remains.
pub fn correlation_id(message_id: Option<&str>, uid: MessageUid) -> String {
    let cleaned: String = message_id
        .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>'))
        .and_then(|id| id.split('@').next())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_CORRELATION_ID)
        .collect();

    if cleaned.is_empty() {
        format!("email_{uid}")
    } else {
        cleaned
    }
}

/// Parse an email date string in various common formats.
///
/// RFC 2822 and RFC 3339 first, then a list of broken real-world variants.
/// The sender's offset is kept so the calendar day matches the header;
/// dates without a zone are taken as UTC.
pub fn parse_date(date_str: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt);
    }

    // "Thu, 04 Jan 2024 ..." → "04 Jan 2024 ..."
    let without_weekday = match trimmed.split_once(',') {
        Some((dow, rest)) if dow.len() == 3 && dow.chars().all(char::is_alphabetic) => rest.trim(),
        _ => trimmed,
    };
    // Trailing comments such as "(UTC)" confuse every format below.
    let candidate = match without_weekday.find(" (") {
        Some(pos) => without_weekday[..pos].trim(),
        None => without_weekday,
    };
    let candidate = replace_named_zone(candidate);

    const FORMATS: &[&str] = &[
        "%d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M %z",
        "%d-%b-%Y %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S %z",
        "%Y-%m-%dT%H:%M:%S%z",
    ];
    const NAIVE_FORMATS: &[&str] = &[
        "%d %b %Y %H:%M:%S",
        "%d-%b-%Y %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
    ];

    for fmt in FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&candidate, fmt) {
            return Some(dt);
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&candidate, fmt) {
            return Some(Utc.from_utc_datetime(&ndt).into());
        }
    }

    debug!(date = trimmed, "Could not parse date");
    None
}

/// Replace a trailing timezone abbreviation with its numeric offset.
fn replace_named_zone(s: &str) -> String {
    const ZONES: &[(&str, &str)] = &[
        ("UT", "+0000"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("CET", "+0100"),
        ("CEST", "+0200"),
    ];
    if let Some((head, zone)) = s.rsplit_once(' ') {
        if let Some((_, offset)) = ZONES.iter().find(|(name, _)| zone.eq_ignore_ascii_case(name)) {
            return format!("{head} {offset}");
        }
    }
    s.to_string()
}
