//! Integration tests for the extraction pipeline against an in-memory
//! mailbox, the real MIME decoder and a temporary output directory.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use assert_fs::prelude::*;
use predicates::prelude::*;

use mailsift::error::{ExtractError, Result};
use mailsift::extract::{self, Progress, RunOptions};
use mailsift::model::message::MessageUid;
use mailsift::model::report::RunReport;
use mailsift::parser::MailParserDecoder;
use mailsift::storage::{DryRunStorage, FsStorage, Storage};
use mailsift::transport::{Folder, Transport};

// ─── Fakes ──────────────────────────────────────────────────────────

/// Folders of raw messages; the UID of a message is its index + 1.
#[derive(Default)]
struct FakeMailbox {
    listing: Vec<String>,
    folders: HashMap<String, Vec<Vec<u8>>>,
    unopenable: HashSet<String>,
    unsearchable: HashSet<String>,
    /// When set, `list_folders` fails with this message.
    list_error: Option<String>,
    fetched: Vec<(String, MessageUid)>,
}

impl FakeMailbox {
    fn with_folder(mut self, name: &str, messages: Vec<Vec<u8>>) -> Self {
        self.listing.push(name.to_string());
        self.folders.insert(name.to_string(), messages);
        self
    }

    fn listed_only(mut self, name: &str) -> Self {
        self.listing.push(name.to_string());
        self
    }

    fn fetched_from(&self, folder: &str) -> Vec<MessageUid> {
        self.fetched
            .iter()
            .filter(|(f, _)| f == folder)
            .map(|(_, uid)| *uid)
            .collect()
    }
}

struct FakeFolder<'a> {
    name: String,
    messages: &'a [Vec<u8>],
    search_fails: bool,
    fetched: &'a mut Vec<(String, MessageUid)>,
}

impl Transport for FakeMailbox {
    fn list_folders(&mut self) -> Result<Vec<String>> {
        match &self.list_error {
            Some(reason) => Err(ExtractError::Transport(reason.clone())),
            None => Ok(self.listing.clone()),
        }
    }

    fn open<'a>(&'a mut self, name: &str) -> Result<Box<dyn Folder + 'a>> {
        if self.unopenable.contains(name) {
            return Err(ExtractError::Transport(format!("cannot EXAMINE {name}")));
        }
        let messages = self
            .folders
            .get(name)
            .ok_or_else(|| ExtractError::Transport(format!("no such folder {name}")))?;
        Ok(Box::new(FakeFolder {
            name: name.to_string(),
            messages,
            search_fails: self.unsearchable.contains(name),
            fetched: &mut self.fetched,
        }))
    }
}

impl Folder for FakeFolder<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn search(&mut self, _criteria: &str) -> Result<Vec<MessageUid>> {
        if self.search_fails {
            return Err(ExtractError::Transport(format!("SEARCH failed in {}", self.name)));
        }
        Ok((1..=self.messages.len() as MessageUid).collect())
    }

    fn fetch(&mut self, uid: MessageUid) -> Result<Vec<u8>> {
        self.fetched.push((self.name.clone(), uid));
        Ok(self.messages[(uid - 1) as usize].clone())
    }
}

/// Filesystem storage that refuses to write files with a given name.
struct RefusingStorage {
    inner: FsStorage,
    refuse: &'static str,
}

impl Storage for RefusingStorage {
    fn ensure_directory(&mut self, dir: &Path) -> Result<()> {
        self.inner.ensure_directory(dir)
    }

    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
        if path.file_name().is_some_and(|n| n == self.refuse) {
            return Err(ExtractError::io(path, std::io::Error::other("disk full")));
        }
        self.inner.write(path, bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

fn mail(id: &str, subject: &str, files: &[&str]) -> Vec<u8> {
    mail_dated(id, subject, "Tue, 02 Jan 2024 10:00:00 +0000", files)
}

fn mail_dated(id: &str, subject: &str, date: &str, files: &[&str]) -> Vec<u8> {
    let mut out = format!(
        "From: Sender <sender@example.com>\r\n\
         Subject: {subject}\r\n\
         Date: {date}\r\n\
         Message-ID: <{id}@example.com>\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"XX\"\r\n\
         \r\n\
         --XX\r\n\
         Content-Type: text/plain\r\n\
         \r\n\
         body\r\n"
    );
    for f in files {
        out.push_str(&format!(
            "--XX\r\n\
             Content-Type: application/octet-stream\r\n\
             Content-Disposition: attachment; filename=\"{f}\"\r\n\
             \r\n\
             payload of {f}\r\n"
        ));
    }
    out.push_str("--XX--\r\n");
    out.into_bytes()
}

fn numbered(prefix: &str, count: usize) -> Vec<Vec<u8>> {
    (1..=count)
        .map(|i| mail(&format!("{prefix}{i}"), "Files", &["a.pdf"]))
        .collect()
}

fn recursive() -> RunOptions {
    RunOptions {
        recursive: true,
        ..RunOptions::default()
    }
}

fn run_dry(mailbox: &mut FakeMailbox, options: &RunOptions) -> RunReport {
    let mut storage = DryRunStorage::new();
    extract::run(mailbox, &MailParserDecoder::new(), &mut storage, options, &|_| true)
        .expect("run")
}

fn assert_saved_count_invariant(report: &RunReport) {
    let per_folder: u64 = report.folders.iter().map(|f| f.attachments_saved).sum();
    assert_eq!(per_folder, report.attachments.len() as u64);
    assert_eq!(report.statistics.attachments_saved, per_folder);
}

// ─── Test 1: Per-folder limit fetches exactly N ─────────────────────

#[test]
fn test_limit_per_folder_stops_fetching() {
    let mut mailbox = FakeMailbox::default().with_folder("INBOX", numbered("m", 5));
    let options = RunOptions {
        limit_per_folder: Some(3),
        ..recursive()
    };
    let report = run_dry(&mut mailbox, &options);

    assert_eq!(report.statistics.messages_processed, 3);
    assert_eq!(mailbox.fetched_from("INBOX"), vec![1, 2, 3]);
    assert!(report.folders[0].limit_reached);
    assert_saved_count_invariant(&report);
}

// ─── Test 2: A malformed message does not stop the folder ───────────

#[test]
fn test_decode_failure_is_recorded_and_skipped() {
    let messages = vec![
        mail("m1", "First", &["a.pdf"]),
        b"   ".to_vec(),
        mail("m3", "Third", &["b.pdf"]),
    ];
    let mut mailbox = FakeMailbox::default().with_folder("INBOX", messages);
    let report = run_dry(&mut mailbox, &RunOptions::default());

    assert_eq!(report.statistics.errors.len(), 1);
    assert!(report.statistics.errors[0].starts_with("INBOX: UID 2:"));
    assert_eq!(report.statistics.messages_processed, 2);
    assert_eq!(report.folders[0].messages_failed, 1);
    assert_eq!(mailbox.fetched_from("INBOX"), vec![1, 2, 3]);
    assert_eq!(report.attachments.len(), 2);
}

// ─── Test 3: Recursive traversal order and scope ────────────────────

#[test]
fn test_recursive_processes_descendants_in_order() {
    let mut mailbox = FakeMailbox::default()
        .with_folder("Sent", numbered("s", 1))
        .with_folder("INBOX/b", numbered("b", 1))
        .with_folder("INBOX", numbered("i", 1))
        .with_folder("INBOXES", numbered("x", 1))
        .with_folder("INBOX/a", numbered("a", 1));
    let report = run_dry(&mut mailbox, &recursive());

    assert_eq!(report.processed_folders, vec!["INBOX", "INBOX/a", "INBOX/b"]);
    assert!(mailbox.fetched_from("Sent").is_empty());
    assert!(mailbox.fetched_from("INBOXES").is_empty());
    assert_saved_count_invariant(&report);
}

// ─── Test 4: Global limit skips remaining folders unopened ──────────

#[test]
fn test_total_limit_skips_remaining_folders() {
    let mut mailbox = FakeMailbox::default()
        .with_folder("INBOX", numbered("i", 2))
        .with_folder("INBOX/a", numbered("a", 3))
        .with_folder("INBOX/b", numbered("b", 3));
    let options = RunOptions {
        total_limit: Some(3),
        ..recursive()
    };
    let report = run_dry(&mut mailbox, &options);

    assert_eq!(report.processed_folders, vec!["INBOX", "INBOX/a"]);
    assert_eq!(report.skipped_folders, vec!["INBOX/b"]);
    assert_eq!(mailbox.fetched_from("INBOX/a"), vec![1]);
    assert_eq!(report.statistics.messages_processed, 3);
}

// ─── Test 5: Unopenable folder is recorded and skipped ──────────────

#[test]
fn test_open_failure_continues_with_next_folder() {
    let mut mailbox = FakeMailbox::default()
        .with_folder("INBOX", numbered("i", 1))
        .listed_only("INBOX/Gone")
        .with_folder("INBOX/Work", numbered("w", 1));
    mailbox.unopenable.insert("INBOX/Gone".to_string());
    let report = run_dry(&mut mailbox, &recursive());

    assert_eq!(report.processed_folders, vec!["INBOX", "INBOX/Work"]);
    assert_eq!(report.statistics.errors.len(), 1);
    assert!(report.statistics.errors[0].contains("INBOX/Gone"));
    assert_eq!(report.statistics.attachments_saved, 2);
}

// ─── Test 6: Files and inventories land on disk ─────────────────────

#[test]
fn test_files_and_reports_written() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let mut mailbox = FakeMailbox::default().with_folder(
        "INBOX",
        vec![mail(
            "inv42",
            "Invoice: March",
            &["invoice.pdf", "setup.exe", "notes.txt", "invoice.pdf"],
        )],
    );
    let options = RunOptions {
        exclude: Some(vec!["@dangerous".to_string()]),
        ..RunOptions::default()
    };
    let mut storage = FsStorage::new(tmp.path());
    let report = extract::run(
        &mut mailbox,
        &MailParserDecoder::new(),
        &mut storage,
        &options,
        &|_| true,
    )
    .unwrap();

    let dir = "INBOX/2024-01-02/2024-01-02_inv42_Invoice_ March";
    tmp.child(format!("{dir}/01_invoice.pdf"))
        .assert(predicate::str::contains("payload of invoice.pdf"));
    tmp.child(format!("{dir}/02_notes.txt"))
        .assert(predicate::path::exists());
    tmp.child(format!("{dir}/03_invoice.pdf"))
        .assert(predicate::path::exists());
    tmp.child(format!("{dir}/01_setup.exe"))
        .assert(predicate::path::missing());
    tmp.child("INBOX/attachments_metadata.json")
        .assert(predicate::str::contains("\"original_filename\": \"notes.txt\""));
    tmp.child("attachments_metadata_total.json")
        .assert(predicate::str::contains("\"attachments_saved\": 3"));

    let sequences: Vec<u32> = report.attachments.iter().map(|a| a.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert_eq!(report.folders[0].attachments_rejected, 1);
    assert!(report.attachments.iter().all(|a| a.sha256.len() == 64));
    assert_saved_count_invariant(&report);
}

// ─── Test 7: A failed write keeps its sequence number ───────────────

#[test]
fn test_write_failure_consumes_sequence_number() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let mut mailbox = FakeMailbox::default()
        .with_folder("INBOX", vec![mail("m1", "Two", &["a.pdf", "b.pdf"])]);
    let mut storage = RefusingStorage {
        inner: FsStorage::new(tmp.path()),
        refuse: "01_a.pdf",
    };
    let options = RunOptions {
        organize_by_date: false,
        ..RunOptions::default()
    };
    let report = extract::run(
        &mut mailbox,
        &MailParserDecoder::new(),
        &mut storage,
        &options,
        &|_| true,
    )
    .unwrap();

    assert_eq!(report.attachments.len(), 1);
    assert_eq!(report.attachments[0].filename, "02_b.pdf");
    assert_eq!(report.folders[0].attachments_failed, 1);
    assert_eq!(report.statistics.errors.len(), 1);
    tmp.child("INBOX/2024-01-02_m1_Two/02_b.pdf")
        .assert(predicate::path::exists());
}

// ─── Test 8: Dry run writes nothing ─────────────────────────────────

#[test]
fn test_dry_run_leaves_disk_untouched() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let out = tmp.child("out");
    let mut mailbox = FakeMailbox::default().with_folder("INBOX", numbered("m", 2));
    let options = RunOptions {
        dry_run: true,
        save_metadata: false,
        ..RunOptions::default()
    };
    let mut storage = DryRunStorage::new();
    let report = extract::run(
        &mut mailbox,
        &MailParserDecoder::new(),
        &mut storage,
        &options,
        &|_| true,
    )
    .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.statistics.attachments_saved, 2);
    assert_eq!(storage.written().count(), 2);
    assert_eq!(storage.bytes(), report.statistics.total_bytes);
    out.assert(predicate::path::missing());
}

// ─── Test 9: Cancellation keeps partial results ─────────────────────

#[test]
fn test_cancel_returns_partial_report() {
    let mut mailbox = FakeMailbox::default()
        .with_folder("INBOX", numbered("i", 3))
        .with_folder("INBOX/a", numbered("a", 3));
    let mut storage = DryRunStorage::new();
    let stop = |p: &Progress| !(p.folder == "INBOX" && p.position == 2);
    let report = extract::run(
        &mut mailbox,
        &MailParserDecoder::new(),
        &mut storage,
        &recursive(),
        &stop,
    )
    .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.statistics.messages_processed, 2);
    assert_eq!(report.skipped_folders, vec!["INBOX/a"]);
    assert_eq!(report.attachments.len(), 2);
}

// ─── Test 10: Invalid options fail before any fetch ─────────────────

#[test]
fn test_invalid_options_are_fatal() {
    let mut mailbox = FakeMailbox::default().with_folder("INBOX", numbered("m", 1));
    let options = RunOptions {
        total_limit: Some(5),
        ..RunOptions::default()
    };
    let mut storage = DryRunStorage::new();
    let err = extract::run(
        &mut mailbox,
        &MailParserDecoder::new(),
        &mut storage,
        &options,
        &|_| true,
    )
    .unwrap_err();

    assert!(err.is_fatal());
    assert!(mailbox.fetched.is_empty());
}

// ─── Test 11: Failed folder listing falls back to the mailbox ───────

#[test]
fn test_list_failure_processes_mailbox_alone() {
    let mut mailbox = FakeMailbox::default()
        .with_folder("INBOX", numbered("i", 2))
        .with_folder("INBOX/a", numbered("a", 1));
    mailbox.list_error = Some("LIST timed out".to_string());
    let report = run_dry(&mut mailbox, &recursive());

    assert_eq!(report.processed_folders, vec!["INBOX"]);
    assert_eq!(report.statistics.errors.len(), 1);
    assert!(report.statistics.errors[0].contains("LIST timed out"));
    assert_eq!(report.statistics.attachments_saved, 2);
    assert!(mailbox.fetched_from("INBOX/a").is_empty());
}

// ─── Test 12: Failed search stops only that folder ──────────────────

#[test]
fn test_search_failure_continues_with_next_folder() {
    let mut mailbox = FakeMailbox::default()
        .with_folder("INBOX", numbered("i", 1))
        .with_folder("INBOX/a", numbered("a", 2))
        .with_folder("INBOX/b", numbered("b", 1));
    mailbox.unsearchable.insert("INBOX/a".to_string());
    let report = run_dry(&mut mailbox, &recursive());

    assert_eq!(report.processed_folders, vec!["INBOX", "INBOX/a", "INBOX/b"]);
    assert_eq!(report.statistics.errors.len(), 1);
    assert!(report.statistics.errors[0].starts_with("INBOX/a: search failed:"));
    assert!(mailbox.fetched_from("INBOX/a").is_empty());
    assert_eq!(mailbox.fetched_from("INBOX/b"), vec![1]);
    assert_eq!(report.attachments.len(), 2);
    assert_saved_count_invariant(&report);
}

// ─── Test 13: Date folders follow the sender's calendar day ─────────

#[test]
fn test_date_folder_uses_header_offset() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let mut mailbox = FakeMailbox::default().with_folder(
        "INBOX",
        vec![mail_dated("x1", "Late", "Thu, 04 Jan 2024 23:30:00 -0500", &["a.pdf"])],
    );
    let mut storage = FsStorage::new(tmp.path());
    let report = extract::run(
        &mut mailbox,
        &MailParserDecoder::new(),
        &mut storage,
        &RunOptions::default(),
        &|_| true,
    )
    .unwrap();

    tmp.child("INBOX/2024-01-04/2024-01-04_x1_Late/01_a.pdf")
        .assert(predicate::path::exists());
    tmp.child("INBOX/2024-01-05")
        .assert(predicate::path::missing());
    let offset = report.attachments[0].date.map(|d| d.offset().local_minus_utc());
    assert_eq!(offset, Some(-5 * 3600));
}

// ─── Test 14: Folders flattening to one directory are reported ──────

#[test]
fn test_shared_output_directory_is_reported() {
    let mut mailbox = FakeMailbox::default()
        .with_folder("INBOX", numbered("i", 1))
        .with_folder("INBOX/a/b", numbered("s", 1))
        .with_folder("INBOX/a?b", numbered("q", 1));
    let report = run_dry(&mut mailbox, &recursive());

    assert_eq!(report.processed_folders, vec!["INBOX", "INBOX/a/b", "INBOX/a?b"]);
    assert_eq!(report.statistics.errors.len(), 1);
    assert!(report.statistics.errors[0].starts_with("INBOX/a?b: output directory 'INBOX_a_b'"));
    assert!(report.statistics.errors[0].contains("shared with 'INBOX/a/b'"));
    assert_eq!(report.statistics.attachments_saved, 3);
}
