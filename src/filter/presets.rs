//! Named pattern collections, referenced as `@name` in pattern lists.

use crate::error::{ExtractError, Result};

/// Office documents and plain text.
pub const DOCUMENTS: &[&str] = &[
    "*.pdf", "*.doc*", "*.xls*", "*.ppt*", "*.txt", "*.rtf", "*.odt", "*.ods", "*.odp",
];

pub const IMAGES: &[&str] = &[
    "*.jpg", "*.jpeg", "*.png", "*.gif", "*.bmp", "*.svg", "*.tiff", "*.tif", "*.webp", "*.ico",
];

pub const ARCHIVES: &[&str] = &["*.zip", "*.rar", "*.7z", "*.tar", "*.gz", "*.bz2", "*.xz"];

/// Executables and scripts.
pub const DANGEROUS: &[&str] = &[
    "*.exe", "*.bat", "*.cmd", "*.sh", "*.dll", "*.scr", "*.vbs", "*.js", "*.jar", "*.app",
    "*.msi", "*.com",
];

/// Temporary, backup and OS metadata files.
pub const TEMPORARY: &[&str] = &[
    "*.tmp", "*.temp", "*.cache", "*.bak", "*.backup", "~*", "*.swp", ".ds_store", "thumbs.d[b]",
];

/// Every preset name with its patterns.
pub const ALL: &[(&str, &[&str])] = &[
    ("documents", DOCUMENTS),
    ("images", IMAGES),
    ("archives", ARCHIVES),
    ("dangerous", DANGEROUS),
    ("temporary", TEMPORARY),
];

/// Look up a preset by name, case-insensitively.
pub fn get(name: &str) -> Option<&'static [&'static str]> {
    let name = name.trim().to_lowercase();
    ALL.iter().find(|(n, _)| *n == name).map(|(_, p)| *p)
}

/// Replace every `@name` entry with the patterns of that preset.
///
/// Other entries are kept as they are. Blank entries are dropped.
pub fn expand(patterns: &[String]) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(patterns.len());
    for raw in patterns {
        let entry = raw.trim();
        if entry.is_empty() {
            continue;
        }
        match entry.strip_prefix('@') {
            Some(name) => {
                let preset = get(name).ok_or_else(|| {
                    ExtractError::config(format!(
                        "unknown pattern preset '@{name}' (known: {})",
                        ALL.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", ")
                    ))
                })?;
                out.extend(preset.iter().map(|p| p.to_string()));
            }
            None => out.push(entry.to_string()),
        }
    }
    Ok(out)
}
