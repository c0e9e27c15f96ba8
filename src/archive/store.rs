//! Archive persistence backends.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::chain::ArchiveEntry;
use crate::core::GendocError;

/// Append-only storage for archive entries, keyed by sequence number.
///
/// `persist` must either store the whole entry or nothing: a failed write
/// may not leave a partial entry behind.
pub trait ArchiveStore: Send {
    /// The most recently persisted entry, if any.
    fn last_entry(&self) -> Result<Option<ArchiveEntry>, GendocError>;

    /// Durably store one entry after the current last one.
    fn persist(&mut self, entry: &ArchiveEntry) -> Result<(), GendocError>;

    /// Every entry in sequence order.
    fn load_all(&self) -> Result<Vec<ArchiveEntry>, GendocError>;
}

/// In-memory store for tests and short-lived runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Vec<ArchiveEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ArchiveStore for MemoryStore {
    fn last_entry(&self) -> Result<Option<ArchiveEntry>, GendocError> {
        Ok(self.entries.last().cloned())
    }

    fn persist(&mut self, entry: &ArchiveEntry) -> Result<(), GendocError> {
        self.entries.push(entry.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<ArchiveEntry>, GendocError> {
        Ok(self.entries.clone())
    }
}

/// One JSON object per line in a local file.
///
/// Each append is flushed with `sync_data`. If writing fails, the file is
/// truncated back to its previous length.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    file: File,
    last: Option<ArchiveEntry>,
}

impl JsonLinesStore {
    /// Open or create the archive file and read back its last entry.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GendocError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| persistence(&path, e))?;

        let mut store = Self {
            path,
            file,
            last: None,
        };
        store.last = store.load_all()?.pop();
        tracing::debug!(
            path = %store.path.display(),
            last = store.last.as_ref().map(|e| e.sequence_number),
            "opened JSON-lines archive"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(line)?;
        self.file.sync_data()
    }
}

impl ArchiveStore for JsonLinesStore {
    fn last_entry(&self) -> Result<Option<ArchiveEntry>, GendocError> {
        Ok(self.last.clone())
    }

    fn persist(&mut self, entry: &ArchiveEntry) -> Result<(), GendocError> {
        let mut line = serde_json::to_vec(entry)
            .map_err(|e| GendocError::Persistence(format!("serialize entry {}: {e}", entry.sequence_number)))?;
        line.push(b'\n');

        let len = self
            .file
            .metadata()
            .map_err(|e| persistence(&self.path, e))?
            .len();
        if let Err(e) = self.write_line(&line) {
            if let Err(rollback) = self.file.set_len(len) {
                tracing::error!(path = %self.path.display(), error = %rollback, "archive rollback failed");
            }
            return Err(persistence(&self.path, e));
        }
        self.last = Some(entry.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<ArchiveEntry>, GendocError> {
        let file = File::open(&self.path).map_err(|e| persistence(&self.path, e))?;
        let mut entries = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| persistence(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: ArchiveEntry = serde_json::from_str(&line).map_err(|e| {
                GendocError::Persistence(format!("{} line {}: {e}", self.path.display(), n + 1))
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

fn persistence(path: &Path, e: std::io::Error) -> GendocError {
    GendocError::Persistence(format!("{}: {e}", path.display()))
}
