//! Sender address handling (RFC 5322 §3.4).

/// Key used for sender directories when no usable address is present.
pub const UNKNOWN_SENDER: &str = "unknown";

/// A parsed email address.
///
/// # Examples
/// - `"Juan García <juan@ejemplo.com>"` → `display_name = "Juan García"`, `address = "juan@ejemplo.com"`
/// - `"user@example.com"` → `display_name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`), empty if unknown.
    pub address: String,
}

impl EmailAddress {
    /// Build from already-split parts, trimming both.
    pub fn new(display_name: impl AsRef<str>, address: impl AsRef<str>) -> Self {
        Self {
            display_name: strip_quotes(display_name.as_ref()),
            address: address.as_ref().trim().to_string(),
        }
    }

    /// Parse a single address from a raw `From:` header value.
    ///
    /// Supported formats:
    /// - `"user@domain.com"`
    /// - `"<user@domain.com>"`
    /// - `"Display Name <user@domain.com>"`
    /// - `"\"Display, Name\" <user@domain.com>"`
    ///
    /// Anything else keeps its first whitespace-separated word as the address.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        if let (Some(open), Some(close)) = (trimmed.rfind('<'), trimmed.rfind('>')) {
            if close > open {
                return Self::new(&trimmed[..open], &trimmed[open + 1..close]);
            }
        }

        let first = trimmed.split_whitespace().next().unwrap_or_default();
        Self {
            display_name: String::new(),
            address: first.to_string(),
        }
    }

    /// The address used to group attachments by sender: the bare address,
    /// or [`UNKNOWN_SENDER`].
    pub fn folder_key(&self) -> &str {
        if self.address.is_empty() {
            UNKNOWN_SENDER
        } else {
            &self.address
        }
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        match (self.display_name.is_empty(), self.address.is_empty()) {
            (true, true) => UNKNOWN_SENDER.to_string(),
            (true, false) => self.address.clone(),
            (false, true) => self.display_name.clone(),
            (false, false) => format!("{} <{}>", self.display_name, self.address),
        }
    }
}

/// Strip surrounding double-quotes and trim whitespace.
fn strip_quotes(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
