//! Connection presets for well-known mail providers.

/// IMAP settings of one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provider {
    /// Lookup key, e.g. `"gmail"`.
    pub key: &'static str,
    pub name: &'static str,
    pub server: &'static str,
    pub port: u16,
    pub use_tls: bool,
    /// Setup hint shown by the `providers` command.
    pub notes: &'static str,
}

pub const PROVIDERS: &[Provider] = &[
    Provider {
        key: "gmail",
        name: "Gmail",
        server: "imap.gmail.com",
        port: 993,
        use_tls: true,
        notes: "Requires an app password (enable 2FA first).",
    },
    Provider {
        key: "outlook",
        name: "Outlook/Office 365",
        server: "outlook.office365.com",
        port: 993,
        use_tls: true,
        notes: "May require an app password when 2FA is enabled.",
    },
    Provider {
        key: "icloud",
        name: "iCloud",
        server: "imap.mail.me.com",
        port: 993,
        use_tls: true,
        notes: "Requires an app-specific password from the Apple ID settings.",
    },
    Provider {
        key: "yahoo",
        name: "Yahoo Mail",
        server: "imap.mail.yahoo.com",
        port: 993,
        use_tls: true,
        notes: "May require an app password (Account Security).",
    },
    Provider {
        key: "gmx",
        name: "GMX",
        server: "imap.gmx.net",
        port: 993,
        use_tls: true,
        notes: "Enable IMAP access in the mail settings.",
    },
    Provider {
        key: "web.de",
        name: "Web.de",
        server: "imap.web.de",
        port: 993,
        use_tls: true,
        notes: "Enable IMAP access in the mail settings.",
    },
    Provider {
        key: "aol",
        name: "AOL",
        server: "imap.aol.com",
        port: 993,
        use_tls: true,
        notes: "May require an app password.",
    },
    Provider {
        key: "mail.com",
        name: "Mail.com",
        server: "imap.mail.com",
        port: 993,
        use_tls: true,
        notes: "Enable IMAP in the settings.",
    },
    Provider {
        key: "zoho",
        name: "Zoho Mail",
        server: "imap.zoho.com",
        port: 993,
        use_tls: true,
        notes: "Enable IMAP access; may need an app-specific password.",
    },
    Provider {
        key: "protonmail",
        name: "ProtonMail",
        server: "127.0.0.1",
        port: 1143,
        use_tls: false,
        notes: "Requires ProtonMail Bridge running locally.",
    },
    Provider {
        key: "fastmail",
        name: "FastMail",
        server: "imap.fastmail.com",
        port: 993,
        use_tls: true,
        notes: "Supports app passwords.",
    },
    Provider {
        key: "mailbox.org",
        name: "Mailbox.org",
        server: "imap.mailbox.org",
        port: 993,
        use_tls: true,
        notes: "",
    },
    Provider {
        key: "yandex",
        name: "Yandex Mail",
        server: "imap.yandex.com",
        port: 993,
        use_tls: true,
        notes: "Enable IMAP in the settings; may need an app password.",
    },
];

const DOMAINS: &[(&str, &str)] = &[
    ("gmail.com", "gmail"),
    ("googlemail.com", "gmail"),
    ("outlook.com", "outlook"),
    ("hotmail.com", "outlook"),
    ("live.com", "outlook"),
    ("msn.com", "outlook"),
    ("icloud.com", "icloud"),
    ("me.com", "icloud"),
    ("mac.com", "icloud"),
    ("yahoo.com", "yahoo"),
    ("yahoo.co.uk", "yahoo"),
    ("yahoo.fr", "yahoo"),
    ("yahoo.de", "yahoo"),
    ("gmx.net", "gmx"),
    ("gmx.de", "gmx"),
    ("gmx.com", "gmx"),
    ("web.de", "web.de"),
    ("aol.com", "aol"),
    ("mail.com", "mail.com"),
    ("zoho.com", "zoho"),
    ("protonmail.com", "protonmail"),
    ("proton.me", "protonmail"),
    ("pm.me", "protonmail"),
    ("fastmail.com", "fastmail"),
    ("fastmail.fm", "fastmail"),
    ("mailbox.org", "mailbox.org"),
    ("yandex.com", "yandex"),
    ("yandex.ru", "yandex"),
];

/// Find a provider by key or display name, case-insensitively.
pub fn lookup(name: &str) -> Option<&'static Provider> {
    let name = name.trim();
    PROVIDERS
        .iter()
        .find(|p| p.key.eq_ignore_ascii_case(name))
        .or_else(|| PROVIDERS.iter().find(|p| p.name.eq_ignore_ascii_case(name)))
}

/// Guess the provider from an email address's domain.
pub fn detect(email: &str) -> Option<&'static Provider> {
    let (_, domain) = email.trim().rsplit_once('@')?;
    DOMAINS
        .iter()
        .find(|(d, _)| d.eq_ignore_ascii_case(domain))
        .and_then(|(_, key)| lookup(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_key_and_name() {
        assert_eq!(lookup("GMAIL").map(|p| p.server), Some("imap.gmail.com"));
        assert_eq!(lookup("Outlook/Office 365").map(|p| p.key), Some("outlook"));
        assert!(lookup("exchange").is_none());
    }

    #[test]
    fn test_protonmail_bridge_is_plain() {
        let p = lookup("protonmail").unwrap();
        assert_eq!((p.server, p.port, p.use_tls), ("127.0.0.1", 1143, false));
    }

    #[test]
    fn test_detect_from_address() {
        assert_eq!(detect("someone@Hotmail.com").map(|p| p.key), Some("outlook"));
        assert_eq!(detect("me@pm.me").map(|p| p.key), Some("protonmail"));
        assert!(detect("me@example.org").is_none());
        assert!(detect("not-an-address").is_none());
    }

    #[test]
    fn test_keys_are_unique() {
        let mut keys: Vec<&str> = PROVIDERS.iter().map(|p| p.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), PROVIDERS.len());
    }
}
