//! Archive-backed resource sets.
//!
//! A set indexes a plain tar archive once at construction — entry path to
//! (data offset, size) — and serves lookups by seeking into the original
//! file. Nothing is extracted or copied. Gzip-compressed archives cannot
//! be seeked into and are rejected at open.

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use hotswap_common::error::{HotswapError, Result};

/// Read-only resource lookup over one tar archive.
#[derive(Debug)]
pub struct ArchiveResourceSet {
    path: PathBuf,
    index: HashMap<String, IndexEntry>,
    file: Mutex<std::fs::File>,
}

#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    offset: u64,
    size: u64,
}

impl ArchiveResourceSet {
    /// Opens an archive and indexes its regular-file entries.
    ///
    /// # Errors
    ///
    /// Returns a `Construction` error if the archive is gzip-compressed,
    /// cannot be opened, or cannot be walked.
    pub fn open(path: &Path) -> Result<Self> {
        if is_gzip_archive(path) {
            return Err(construction(path, "gzip archives cannot be served in place"));
        }

        let reader =
            std::fs::File::open(path).map_err(|e| construction(path, e.to_string()))?;
        let mut archive = tar::Archive::new(reader);
        let entries = archive
            .entries()
            .map_err(|e| construction(path, e.to_string()))?;

        let mut index = HashMap::new();
        for entry in entries {
            let entry = entry.map_err(|e| construction(path, e.to_string()))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let entry_path = entry.path().map_err(|e| construction(path, e.to_string()))?;
            let key = normalize(&entry_path.to_string_lossy());
            let _ = index.insert(
                key,
                IndexEntry {
                    offset: entry.raw_file_position(),
                    size: entry.size(),
                },
            );
        }
        tracing::debug!(
            archive = %path.display(),
            entries = index.len(),
            "indexed resource archive"
        );

        // Fresh handle for lookups; the indexing reader is positioned at EOF.
        let file = std::fs::File::open(path).map_err(|e| construction(path, e.to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            index,
            file: Mutex::new(file),
        })
    }

    /// Returns the resource bytes at `path`, or `None` if the archive has
    /// no such entry.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the archive file cannot be read back.
    pub fn get(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let Some(entry) = self.index.get(&normalize(path)) else {
            return Ok(None);
        };
        let mut file = self
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let _ = file
            .seek(SeekFrom::Start(entry.offset))
            .map_err(|e| HotswapError::io(&self.path, e))?;
        let mut buf = vec![0u8; entry.size as usize];
        file.read_exact(&mut buf)
            .map_err(|e| HotswapError::io(&self.path, e))?;
        Ok(Some(buf))
    }

    /// Whether the archive contains an entry at `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(&normalize(path))
    }

    /// Number of indexed resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the archive holds no regular-file entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Path of the backing archive.
    #[must_use]
    pub fn archive_path(&self) -> &Path {
        &self.path
    }
}

/// Strips the leading slash so `/x.class` and `x.class` address the same entry.
fn normalize(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

/// Determines whether the archive is gzip-compressed based on extension.
fn is_gzip_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("tgz"))
}

fn construction(archive: &Path, message: impl Into<String>) -> HotswapError {
    HotswapError::Construction {
        archive: archive.to_path_buf(),
        message: message.into(),
    }
}
