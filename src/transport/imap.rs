//! IMAP implementation of [`Transport`] over the `imap` crate.
//!
//! Folders are opened with `EXAMINE` and messages fetched with
//! `BODY.PEEK[]`, so an extraction run never changes flags on the server.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use ::imap::types::NameAttribute;
use tracing::{debug, info, warn};

use super::{Folder, Transport};
use crate::error::{ExtractError, Result};
use crate::model::message::MessageUid;

/// Byte stream an IMAP session can run over (TLS or plain TCP).
pub trait ImapStream: Read + Write + Send {}

impl<T: Read + Write + Send> ImapStream for T {}

type Session = ::imap::Session<Box<dyn ImapStream>>;

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub server: String,
    pub port: u16,
    /// Implicit TLS (port 993 style). Plain TCP otherwise.
    pub use_tls: bool,
    /// Applied to connect, reads and writes. A fetch that stalls longer
    /// fails with a transport error instead of hanging the run.
    pub timeout: Duration,
}

/// A logged-in IMAP session.
pub struct ImapTransport {
    session: Session,
    server: String,
}

impl ImapTransport {
    /// Connect, read the greeting and `LOGIN`.
    ///
    /// A rejected login maps to [`ExtractError::Authentication`], everything
    /// else to [`ExtractError::Transport`].
    pub fn connect(options: &ConnectOptions, username: &str, password: &str) -> Result<Self> {
        info!(server = %options.server, port = options.port, tls = options.use_tls, "Connecting");

        let tcp = connect_tcp(options)?;
        let stream: Box<dyn ImapStream> = if options.use_tls {
            let connector = native_tls::TlsConnector::builder().build().map_err(|e| {
                ExtractError::Transport(format!("failed to build TLS connector: {e}"))
            })?;
            let tls = connector.connect(&options.server, tcp).map_err(|e| {
                ExtractError::Transport(format!(
                    "TLS handshake with '{}' failed: {e}",
                    options.server
                ))
            })?;
            Box::new(tls)
        } else {
            Box::new(tcp)
        };

        let mut client = ::imap::Client::new(stream);
        client.read_greeting()?;

        let session = client
            .login(username, password)
            .map_err(|(e, _client)| ExtractError::Authentication(e.to_string()))?;

        info!(server = %options.server, user = username, "Logged in");
        Ok(Self {
            session,
            server: options.server.clone(),
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }
}

/// Open a TCP connection to the first reachable address, with timeouts set.
fn connect_tcp(options: &ConnectOptions) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = (options.server.as_str(), options.port)
        .to_socket_addrs()
        .map_err(|e| {
            ExtractError::Transport(format!("cannot resolve '{}': {e}", options.server))
        })?
        .collect();

    let mut last_error = None;
    for addr in &addrs {
        match TcpStream::connect_timeout(addr, options.timeout) {
            Ok(tcp) => {
                let timeout = Some(options.timeout);
                tcp.set_read_timeout(timeout)
                    .and_then(|_| tcp.set_write_timeout(timeout))
                    .map_err(|e| ExtractError::Transport(format!("cannot set timeouts: {e}")))?;
                debug!(%addr, "TCP connected");
                return Ok(tcp);
            }
            Err(e) => {
                debug!(%addr, error = %e, "Connect attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(ExtractError::Transport(match last_error {
        Some(e) => format!(
            "failed to connect to {}:{}: {e}",
            options.server, options.port
        ),
        None => format!("'{}' resolved to no addresses", options.server),
    }))
}

impl Transport for ImapTransport {
    fn list_folders(&mut self) -> Result<Vec<String>> {
        let names = self.session.list(Some(""), Some("*"))?;
        let folders: Vec<String> = names
            .iter()
            .filter(|n| !n.attributes().iter().any(|a| matches!(a, NameAttribute::NoSelect)))
            .map(|n| n.name().to_string())
            .collect();
        debug!(count = folders.len(), "Listed folders");
        Ok(folders)
    }

    fn open<'a>(&'a mut self, name: &str) -> Result<Box<dyn Folder + 'a>> {
        let mailbox = self.session.examine(name)?;
        debug!(folder = name, exists = mailbox.exists, "Folder opened read-only");
        Ok(Box::new(ImapFolder {
            session: &mut self.session,
            name: name.to_string(),
        }))
    }
}

impl Drop for ImapTransport {
    fn drop(&mut self) {
        if let Err(e) = self.session.logout() {
            warn!(error = %e, "LOGOUT failed");
        }
    }
}

/// A folder opened on an [`ImapTransport`].
struct ImapFolder<'a> {
    session: &'a mut Session,
    name: String,
}

impl Folder for ImapFolder<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn search(&mut self, criteria: &str) -> Result<Vec<MessageUid>> {
        let mut uids: Vec<MessageUid> = self.session.uid_search(criteria)?.into_iter().collect();
        uids.sort_unstable();
        Ok(uids)
    }

    fn fetch(&mut self, uid: MessageUid) -> Result<Vec<u8>> {
        let fetches = self.session.uid_fetch(uid.to_string(), "BODY.PEEK[]")?;
        fetches
            .iter()
            .find(|f| f.uid == Some(uid) || f.uid.is_none())
            .and_then(|f| f.body())
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                ExtractError::Transport(format!("server returned no body for UID {uid}"))
            })
    }
}
