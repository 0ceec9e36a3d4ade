//! Where extracted files go.
//!
//! All paths handed to a [`Storage`] are relative to its root.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ExtractError, Result};

/// Minimal filesystem surface used by the extractor.
pub trait Storage {
    /// Create `dir` and any missing parents.
    fn ensure_directory(&mut self, dir: &Path) -> Result<()>;

    /// Write `bytes` to `path`, replacing any existing file.
    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Human-readable location of the root, for messages.
    fn describe(&self) -> String;
}

/// Writes under a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Storage for FsStorage {
    fn ensure_directory(&mut self, dir: &Path) -> Result<()> {
        let full = self.root.join(dir);
        std::fs::create_dir_all(&full).map_err(|e| ExtractError::io(dir, e))
    }

    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
        let full = self.root.join(path);
        debug!(path = %full.display(), size = bytes.len(), "Writing file");
        std::fs::write(&full, bytes).map_err(|e| ExtractError::io(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        self.root.join(path).exists()
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

/// Accepts every write without touching the disk.
///
/// Remembers written paths so that collision handling behaves as it would
/// on a real run.
#[derive(Debug, Default)]
pub struct DryRunStorage {
    written: HashSet<PathBuf>,
    bytes: u64,
}

impl DryRunStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths that would have been written.
    pub fn written(&self) -> impl Iterator<Item = &Path> {
        self.written.iter().map(PathBuf::as_path)
    }

    /// Total payload size that would have been written.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Storage for DryRunStorage {
    fn ensure_directory(&mut self, _dir: &Path) -> Result<()> {
        Ok(())
    }

    fn write(&mut self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.written.insert(path.to_path_buf());
        self.bytes += bytes.len() as u64;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.written.contains(path)
    }

    fn describe(&self) -> String {
        "(dry run)".to_string()
    }
}

/// Return `dir/name`, or the first free `dir/{stem}_{n}.{ext}` if taken.
pub fn unique_path(storage: &dyn Storage, dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !storage.exists(&candidate) {
        return candidate;
    }

    let (stem, ext) = match name.rfind('.') {
        Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    };

    for i in 1..10_000 {
        let candidate = dir.join(format!("{stem}_{i}{ext}"));
        if !storage.exists(&candidate) {
            return candidate;
        }
    }

    // All numbered names taken
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("{stem}_{stamp}{ext}"))
}
