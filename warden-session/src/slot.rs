//! Durable slots
//!
//! A slot holds at most one serialized record. Absence is a valid state.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tempfile::NamedTempFile;
use tracing::debug;

/// One durable key/value cell
pub trait SessionSlot: Send + Sync {
    /// Current contents, `None` when the slot is empty
    fn read(&self) -> io::Result<Option<String>>;

    /// Replace the contents
    fn write(&self, value: &str) -> io::Result<()>;

    /// Empty the slot; removing an empty slot succeeds
    fn remove(&self) -> io::Result<()>;

    /// Human-readable location, used in log events
    fn describe(&self) -> String;
}

/// A slot backed by one file on disk.
///
/// Every write lands in its own uniquely named sibling temporary file and is then
/// renamed into place, so concurrent writers never share a staging file and a
/// reader sees either the old record or a complete new one.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl SessionSlot for FileSlot {
    fn read(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, value: &str) -> io::Result<()> {
        let directory = self.directory();
        std::fs::create_dir_all(directory)?;

        let mut staging = NamedTempFile::new_in(directory)?;
        staging.write_all(value.as_bytes())?;
        staging.flush()?;
        staging.persist(&self.path).map_err(|e| e.error)?;

        debug!("Wrote slot {}", self.path.display());
        Ok(())
    }

    fn remove(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed slot {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// An in-process slot. Clones share the same cell, so two clones behave like two
/// independent holders of one storage key.
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    cell: Arc<RwLock<Option<String>>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionSlot for MemorySlot {
    fn read(&self) -> io::Result<Option<String>> {
        Ok(self
            .cell
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn write(&self, value: &str) -> io::Result<()> {
        *self.cell.write().unwrap_or_else(PoisonError::into_inner) = Some(value.to_string());
        Ok(())
    }

    fn remove(&self) -> io::Result<()> {
        *self.cell.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
