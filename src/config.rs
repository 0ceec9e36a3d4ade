//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `--config FILE` on the command line
//! 2. `$MAILSIFT_CONFIG` (environment variable)
//! 3. `~/.config/mailsift/config.toml` (Linux/macOS)
//!    `%APPDATA%\mailsift\config.toml` (Windows)
//! 4. Built-in defaults
//!
//! Command-line flags override file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};
use crate::extract::RunOptions;
use crate::providers;
use crate::transport::imap::ConnectOptions;

/// Environment variable consulted when no password is configured.
pub const PASSWORD_ENV: &str = "MAILSIFT_PASSWORD";

/// Environment variable pointing at the config file.
pub const CONFIG_ENV: &str = "MAILSIFT_CONFIG";

const DEFAULT_PORT: u16 = 993;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    /// Server and account.
    pub connection: ConnectionConfig,
    /// Which folder(s) and messages.
    pub mailbox: MailboxConfig,
    /// Output location and directory layout.
    pub output: OutputConfig,
    /// Message budgets.
    pub limits: LimitsConfig,
    /// Include/exclude patterns.
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Preset name, see [`providers`]. Fills in server, port and TLS when unset.
    pub provider: Option<String>,
    pub server: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    /// Falls back to `$MAILSIFT_PASSWORD`.
    pub password: Option<String>,
    pub use_tls: Option<bool>,
    /// Socket timeout for connect, reads and writes.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    pub name: String,
    pub search_criteria: String,
    pub recursive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Defaults to `./mail_attachments_{timestamp}`.
    pub save_path: Option<PathBuf>,
    pub organize_by_sender: bool,
    pub organize_by_date: bool,
    pub save_metadata: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub limit: Option<u64>,
    pub limit_per_folder: Option<u64>,
    pub total_limit: Option<u64>,
}

/// An absent list and an empty list mean different things: absent
/// includes everything, empty includes nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            provider: None,
            server: None,
            port: None,
            username: None,
            password: None,
            use_tls: None,
            timeout_secs: 60,
        }
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            name: "INBOX".to_string(),
            search_criteria: "ALL".to_string(),
            recursive: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            save_path: None,
            organize_by_sender: false,
            organize_by_date: true,
            save_metadata: true,
        }
    }
}

// ── Resolution ──────────────────────────────────────────────────

/// Account credentials for `LOGIN`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<hidden>")
            .finish()
    }
}

impl Config {
    /// Pipeline options from the `[mailbox]`, `[output]`, `[limits]` and
    /// `[filter]` sections.
    pub fn run_options(&self, dry_run: bool) -> RunOptions {
        RunOptions {
            mailbox: self.mailbox.name.clone(),
            search_criteria: self.mailbox.search_criteria.clone(),
            organize_by_sender: self.output.organize_by_sender,
            organize_by_date: self.output.organize_by_date,
            recursive: self.mailbox.recursive,
            limit: self.limits.limit,
            limit_per_folder: self.limits.limit_per_folder,
            total_limit: self.limits.total_limit,
            include: self.filter.include.clone(),
            exclude: self.filter.exclude.clone(),
            save_metadata: self.output.save_metadata,
            dry_run,
        }
    }

    /// Server settings with the provider preset applied.
    pub fn connect_options(&self) -> Result<ConnectOptions> {
        let conn = &self.connection;
        let preset = match conn.provider.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(name) => Some(providers::lookup(name).ok_or_else(|| {
                ExtractError::config(format!("unknown provider '{name}'"))
            })?),
            None => None,
        };

        let server = conn
            .server
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| preset.map(|p| p.server.to_string()))
            .ok_or_else(|| ExtractError::config("no server configured"))?;
        let port = conn
            .port
            .or_else(|| preset.map(|p| p.port))
            .unwrap_or(DEFAULT_PORT);
        if port == 0 {
            return Err(ExtractError::config("port must be between 1 and 65535"));
        }
        if conn.timeout_secs == 0 {
            return Err(ExtractError::config("timeout_secs must be at least 1"));
        }

        Ok(ConnectOptions {
            server,
            port,
            use_tls: conn.use_tls.or_else(|| preset.map(|p| p.use_tls)).unwrap_or(true),
            timeout: Duration::from_secs(conn.timeout_secs),
        })
    }

    /// Username from the config, password from the config or `$MAILSIFT_PASSWORD`.
    pub fn credentials(&self) -> Result<Credentials> {
        let username = self
            .connection
            .username
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ExtractError::config("no username configured"))?;
        let password = self
            .connection
            .password
            .clone()
            .or_else(|| std::env::var(PASSWORD_ENV).ok())
            .ok_or_else(|| {
                ExtractError::config(format!("no password configured (set {PASSWORD_ENV})"))
            })?;
        Ok(Credentials { username, password })
    }

    /// Guess `[connection] provider` from the username when nothing else
    /// says where to connect.
    pub fn apply_detected_provider(&mut self) {
        if self.connection.server.is_some() || self.connection.provider.is_some() {
            return;
        }
        if let Some(p) = self.connection.username.as_deref().and_then(providers::detect) {
            tracing::info!(provider = p.key, "Provider detected from username");
            self.connection.provider = Some(p.key.to_string());
        }
    }

    /// Copy with the password masked, for display.
    pub fn redacted(&self) -> Config {
        let mut copy = self.clone();
        if copy.connection.password.is_some() {
            copy.connection.password = Some("********".to_string());
        }
        copy
    }

    /// Output root: configured path or `./mail_attachments_{timestamp}`.
    pub fn output_dir(&self) -> PathBuf {
        self.output.save_path.clone().unwrap_or_else(|| {
            PathBuf::from(format!(
                "mail_attachments_{}",
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            ))
        })
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match load_config_from(&path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to load config, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Load one specific file. Unlike [`load_config`], failures are errors.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
    let cfg = toml::from_str::<Config>(&contents)
        .map_err(|e| ExtractError::config(format!("{}: {e}", path.display())))?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(cfg)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mailsift").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailsift")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mailsift.log")
}
