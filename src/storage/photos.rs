//! Captured photo directory: listing, bulk archive and bulk delete.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

/// Errors raised by photo storage operations.
///
/// A missing directory or file is not an error; operations report it as
/// an empty result instead.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {}: {}", path.display(), source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to delete {}: {}", path.display(), source)]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Result of [`PhotoStore::delete_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// This many files were removed.
    Deleted(usize),
    /// There was no capture directory to clean.
    DirectoryMissing,
}

/// The directory capture sessions write into.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Regular files in the directory, sorted by name.
    ///
    /// A missing directory lists as empty.
    pub fn list(&self) -> Result<Vec<PathBuf>, StorageError> {
        let read_err = |source: std::io::Error| StorageError::Read {
            path: self.dir.clone(),
            source,
        };

        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_err(e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(read_err)?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Packs every file into an in-memory zip archive.
    ///
    /// Returns `None` when there is nothing to archive. Images are stored
    /// uncompressed since JPEG data does not deflate further.
    pub fn archive(&self) -> Result<Option<Vec<u8>>, StorageError> {
        let files = self.list()?;
        if files.is_empty() {
            return Ok(None);
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for path in &files {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                tracing::warn!(path = %path.display(), "Skipping file with non UTF-8 name");
                continue;
            };
            let bytes = std::fs::read(path).map_err(|source| StorageError::Read {
                path: path.clone(),
                source,
            })?;
            zip.start_file(name, options)?;
            zip.write_all(&bytes)
                .map_err(|e| StorageError::Archive(e.into()))?;
        }

        let archive = zip.finish()?.into_inner();
        tracing::debug!(files = files.len(), bytes = archive.len(), "Archive built");
        Ok(Some(archive))
    }

    /// Removes every regular file from the directory.
    ///
    /// Subdirectories are left alone.
    pub fn delete_all(&self) -> Result<DeleteOutcome, StorageError> {
        if !self.dir.is_dir() {
            return Ok(DeleteOutcome::DirectoryMissing);
        }

        let files = self.list()?;
        for path in &files {
            std::fs::remove_file(path).map_err(|source| StorageError::Delete {
                path: path.clone(),
                source,
            })?;
        }
        tracing::info!(deleted = files.len(), dir = %self.dir.display(), "Photos deleted");
        Ok(DeleteOutcome::Deleted(files.len()))
    }
}

/// Reads a whole file, or `None` if it does not exist.
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StorageError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
