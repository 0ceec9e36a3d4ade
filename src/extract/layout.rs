//! Where on disk each attachment goes.
//!
//! ```text
//! {folder}/[{sender}/][{YYYY-MM-DD}/]{YYYY-MM-DD}_{correlation id}_{subject}/{NN}_{file}
//! ```

use std::path::{Path, PathBuf};

use crate::model::message::MessageRecord;

/// Date component used when a message has no parseable `Date:`.
pub const UNDATED: &str = "undated";

/// Longest directory component produced.
pub const MAX_DIR_NAME: usize = 100;

/// Longest file name produced, extension included.
pub const MAX_FILE_NAME: usize = 200;

/// Subject characters kept in message folder names.
pub const MAX_SUBJECT: usize = 50;

const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Make `name` safe as a file name on every common filesystem.
///
/// The extension survives truncation.
pub fn sanitize_file_name(name: &str) -> String {
    let clean = finish(replace_invalid(name));
    trim_edges(&truncate_keeping_extension(&clean, MAX_FILE_NAME)).to_string()
}

/// Make `name` safe as a single directory component.
pub fn sanitize_dir_name(name: &str) -> String {
    let clean = finish(replace_invalid(name));
    let clean: String = clean.chars().take(MAX_DIR_NAME).collect();
    trim_edges(&clean).to_string()
}

/// Replace forbidden and control characters, one `_` per run.
fn replace_invalid(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_control() || INVALID_CHARS.contains(&c) {
            if !in_run {
                out.push('_');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

fn truncate_keeping_extension(name: &str, max: usize) -> String {
    let len = name.chars().count();
    if len <= max {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 && name[dot..].chars().count() < max => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    };
    let keep = max - ext.chars().count();
    let mut out: String = stem.chars().take(keep).collect();
    out.push_str(ext);
    out
}

fn trim_edges(name: &str) -> &str {
    name.trim_matches(|c: char| c.is_whitespace() || c == '.')
}

/// Trim, guard reserved device names and never return an empty string.
///
/// Runs before truncation so the `_` prefix counts against the length cap.
fn finish(name: String) -> String {
    let trimmed = trim_edges(&name);
    if trimmed.is_empty() {
        return "unnamed".to_string();
    }
    let stem = trimmed.split('.').next().unwrap_or(trimmed).trim_end();
    if RESERVED_NAMES.iter().any(|r| stem.eq_ignore_ascii_case(r)) {
        format!("_{trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// `YYYY-MM-DD` of the message, or [`UNDATED`].
pub fn date_component(message: &MessageRecord) -> String {
    message
        .timestamp
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| UNDATED.to_string())
}

/// Directory name for one message: `{date}_{correlation id}_{subject}`.
pub fn message_folder_name(message: &MessageRecord) -> String {
    let subject: String = message.subject.chars().take(MAX_SUBJECT).collect();
    sanitize_dir_name(&format!(
        "{}_{}_{}",
        date_component(message),
        message.correlation_id,
        sanitize_dir_name(&subject)
    ))
}

/// Directory, relative to the storage root, holding the attachments of
/// `message` found in `folder_name`.
pub fn placement_for(
    folder_name: &str,
    message: &MessageRecord,
    organize_by_sender: bool,
    organize_by_date: bool,
) -> PathBuf {
    let mut path = PathBuf::from(sanitize_dir_name(folder_name));
    if organize_by_sender {
        path.push(sanitize_dir_name(message.sender.folder_key()));
    }
    if organize_by_date {
        path.push(date_component(message));
    }
    path.push(message_folder_name(message));
    path
}

/// `{seq:02}_{name}`; `name` must already be sanitized.
pub fn attachment_file_name(sequence: u32, name: &str) -> String {
    format!("{sequence:02}_{name}")
}

/// `/`-separated form of a relative path, for reports.
pub fn display_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::*;
    use crate::model::address::EmailAddress;

    fn message(subject: &str, with_date: bool) -> MessageRecord {
        MessageRecord {
            uid: 12,
            correlation_id: "CAF123".into(),
            sender: EmailAddress::parse("Bob <bob@example.com>"),
            subject: subject.into(),
            timestamp: with_date.then(|| {
                FixedOffset::east_opt(3600)
                    .unwrap()
                    .with_ymd_and_hms(2024, 3, 9, 8, 0, 0)
                    .unwrap()
            }),
            parts: Vec::new(),
        }
    }

    #[test]
    fn test_sanitize_replaces_and_collapses() {
        assert_eq!(sanitize_file_name("a<>b.pdf"), "a_b.pdf");
        assert_eq!(sanitize_file_name("re: report?.pdf"), "re_ report_.pdf");
        assert_eq!(sanitize_file_name("tab\there"), "tab_here");
        assert_eq!(sanitize_file_name("  .hidden.  "), "hidden");
    }

    #[test]
    fn test_sanitize_empty_and_reserved() {
        assert_eq!(sanitize_file_name(""), "unnamed");
        assert_eq!(sanitize_file_name(" ... "), "unnamed");
        assert_eq!(sanitize_file_name("con.txt"), "_con.txt");
        assert_eq!(sanitize_dir_name("LPT1"), "_LPT1");
        assert_eq!(sanitize_file_name("console.txt"), "console.txt");
    }

    #[test]
    fn test_reserved_prefix_stays_within_caps() {
        let file = sanitize_file_name(&format!("con.{}.txt", "x".repeat(300)));
        assert_eq!(file.chars().count(), MAX_FILE_NAME);
        assert!(file.starts_with("_con."));
        assert!(file.ends_with(".txt"));

        let dir = sanitize_dir_name(&format!("LPT1.{}", "y".repeat(150)));
        assert_eq!(dir.chars().count(), MAX_DIR_NAME);
        assert!(dir.starts_with("_LPT1."));
    }

    #[test]
    fn test_long_file_name_keeps_extension() {
        let long = format!("{}.pdf", "x".repeat(300));
        let out = sanitize_file_name(&long);
        assert_eq!(out.chars().count(), MAX_FILE_NAME);
        assert!(out.ends_with(".pdf"));
        assert_eq!(sanitize_dir_name(&"y".repeat(150)).chars().count(), MAX_DIR_NAME);
    }

    #[test]
    fn test_message_folder_name() {
        assert_eq!(
            message_folder_name(&message("Invoice: March", true)),
            "2024-03-09_CAF123_Invoice_ March"
        );
        assert_eq!(
            message_folder_name(&message("x", false)),
            "undated_CAF123_x"
        );
        let long = message(&"s".repeat(80), true);
        assert_eq!(
            message_folder_name(&long),
            format!("2024-03-09_CAF123_{}", "s".repeat(MAX_SUBJECT))
        );
    }

    #[test]
    fn test_placement_options() {
        let msg = message("Hi", true);
        assert_eq!(
            placement_for("INBOX", &msg, false, false),
            PathBuf::from("INBOX/2024-03-09_CAF123_Hi")
        );
        assert_eq!(
            placement_for("INBOX/Work", &msg, true, true),
            PathBuf::from("INBOX_Work/bob@example.com/2024-03-09/2024-03-09_CAF123_Hi")
        );
    }

    #[test]
    fn test_date_uses_sender_calendar_day() {
        let mut msg = message("Late", true);
        msg.timestamp = Some(
            FixedOffset::west_opt(5 * 3600)
                .unwrap()
                .with_ymd_and_hms(2024, 1, 4, 23, 30, 0)
                .unwrap(),
        );
        assert_eq!(
            placement_for("INBOX", &msg, false, true),
            PathBuf::from("INBOX/2024-01-04/2024-01-04_CAF123_Late")
        );
    }

    #[test]
    fn test_placement_is_deterministic() {
        let msg = message("Same", false);
        assert_eq!(
            placement_for("INBOX", &msg, true, true),
            placement_for("INBOX", &msg, true, true)
        );
    }

    #[test]
    fn test_attachment_file_name() {
        assert_eq!(attachment_file_name(1, "a.pdf"), "01_a.pdf");
        assert_eq!(attachment_file_name(123, "a.pdf"), "123_a.pdf");
        assert_eq!(display_path(Path::new("INBOX/x/01_a.pdf")), "INBOX/x/01_a.pdf");
    }
}
