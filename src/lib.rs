//! `mailsift`: download email attachments over IMAP, keep the ones whose
//! names pass include/exclude patterns, and file them into a predictable
//! directory tree with a JSON inventory.
//!
//! The pipeline in [`extract`] only talks to the [`transport::Transport`],
//! [`parser::Decoder`] and [`storage::Storage`] traits, so it runs the same
//! against a live server or in-memory fakes.

pub mod config;
pub mod error;
pub mod extract;
pub mod filter;
pub mod model;
pub mod parser;
pub mod providers;
pub mod storage;
pub mod transport;
