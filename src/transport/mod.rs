//! Mailbox access: folder listing, search and fetch.
//!
//! The extractor only talks to these traits. [`imap::ImapTransport`] is the
//! production implementation; tests supply in-memory fakes.

pub mod imap;

use crate::error::Result;
use crate::model::message::MessageUid;

/// A mail account with a folder hierarchy.
pub trait Transport {
    /// Every selectable folder name, in server order.
    fn list_folders(&mut self) -> Result<Vec<String>>;

    /// Open `name` for reading. Only one folder is open at a time; the
    /// returned handle borrows the session.
    fn open<'a>(&'a mut self, name: &str) -> Result<Box<dyn Folder + 'a>>;
}

/// An opened folder.
pub trait Folder {
    fn name(&self) -> &str;

    /// Ids of the messages matching a search expression such as `ALL` or
    /// `SINCE 01-Jan-2024`, ascending.
    fn search(&mut self, criteria: &str) -> Result<Vec<MessageUid>>;

    /// Raw RFC 5322 bytes of one message.
    fn fetch(&mut self, uid: MessageUid) -> Result<Vec<u8>>;
}

/// Whether `candidate` is `root` itself or lies below it.
///
/// Both `/` and `.` are accepted as hierarchy delimiters since servers
/// differ.
pub fn is_within(root: &str, candidate: &str) -> bool {
    if candidate == root {
        return true;
    }
    candidate
        .strip_prefix(root)
        .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('.'))
}
