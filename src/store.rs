//! Named blob store for catalog snapshots
//!
//! Each catalog is persisted as one blob under its own name. The store only
//! needs to hand back the bytes and when they were last written; freshness
//! decisions live in `freshness`.

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Bytes of a stored snapshot plus the time they were written.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub modified: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
pub trait BlobStore: Send + Sync {
    /// Read a blob; `Ok(None)` when nothing is stored under `name`.
    fn read(&self, name: &str) -> Result<Option<StoredBlob>>;

    /// Replace the blob stored under `name`.
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;
}

/// One file per blob inside a directory (`~/.ec2FleetCompare` by default).
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl BlobStore for FsBlobStore {
    fn read(&self, name: &str) -> Result<Option<StoredBlob>> {
        let path = self.path_for(name);
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let modified = DateTime::<Utc>::from(metadata.modified()?);
        let bytes = std::fs::read(&path)?;
        Ok(Some(StoredBlob { bytes, modified }))
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        crate::utils::ensure_dir(&self.dir)?;
        std::fs::write(self.path_for(name), bytes)?;
        Ok(())
    }
}
