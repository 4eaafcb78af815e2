//! File-backed cache storing one MessagePack file per key.
//!
//! Recency is tracked through file modification times: a hit touches the
//! file, and eviction removes the oldest files first until the directory is
//! back within its entry and byte bounds.

use crate::cache::{CacheBackend, CacheKey};
use crate::core::config::CacheSettings;
use crate::error::{DocExtractError, Result};
use crate::types::ExtractionResult;
use filetime::FileTime;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

const ENTRY_EXTENSION: &str = "msgpack";

struct DiskEntry {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

#[derive(Debug)]
pub struct DiskCache {
    directory: PathBuf,
    max_entries: usize,
    max_bytes: Option<usize>,
}

impl DiskCache {
    /// Open (and create if needed) a cache directory.
    pub fn new(directory: impl Into<PathBuf>, max_entries: usize, max_bytes: Option<usize>) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(|e| {
            DocExtractError::cache_with_source(
                format!("Failed to create cache directory {}", directory.display()),
                e,
            )
        })?;
        Ok(Self {
            directory,
            max_entries: max_entries.max(1),
            max_bytes,
        })
    }

    /// Disk cache from settings; `None` when no directory is configured.
    pub fn from_settings(settings: &CacheSettings) -> Result<Option<Self>> {
        settings
            .directory
            .as_ref()
            .map(|dir| Self::new(dir, settings.max_entries, settings.max_bytes))
            .transpose()
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.directory.join(format!("{}.{ENTRY_EXTENSION}", key.as_str()))
    }

    fn scan(&self) -> Result<Vec<DiskEntry>> {
        let read_dir = fs::read_dir(&self.directory).map_err(|e| io_error("Failed to list cache directory", e))?;
        let mut entries = Vec::new();
        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            // Entries removed concurrently are skipped.
            if let Ok(metadata) = entry.metadata() {
                entries.push(DiskEntry {
                    path,
                    size: metadata.len(),
                    modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                });
            }
        }
        Ok(entries)
    }

    fn evict(&self) -> Result<()> {
        let mut entries = self.scan()?;
        let mut total: u64 = entries.iter().map(|e| e.size).sum();
        let over = |count: usize, total: u64| {
            count > self.max_entries || self.max_bytes.is_some_and(|max| total > max as u64)
        };
        if !over(entries.len(), total) {
            return Ok(());
        }

        entries.sort_by_key(|e| e.modified);
        let mut remaining = entries.len();
        for entry in entries {
            if !over(remaining, total) || remaining <= 1 {
                break;
            }
            match fs::remove_file(&entry.path) {
                Ok(()) => tracing::debug!("Evicted cache file {}", entry.path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_error("Failed to evict cache entry", e)),
            }
            remaining -= 1;
            total = total.saturating_sub(entry.size);
        }
        Ok(())
    }
}

fn io_error(message: &str, err: std::io::Error) -> DocExtractError {
    DocExtractError::cache_with_source(message, err)
}

impl CacheBackend for DiskCache {
    fn name(&self) -> &str {
        "disk"
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Arc<ExtractionResult>>> {
        let path = self.entry_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("Failed to read cache entry", e)),
        };

        let result: ExtractionResult = match rmp_serde::from_slice(&bytes) {
            Ok(result) => result,
            Err(e) => {
                let _ = fs::remove_file(&path);
                return Err(DocExtractError::cache_with_source(
                    format!("Corrupt cache entry {key} removed"),
                    e,
                ));
            }
        };

        if let Err(e) = filetime::set_file_mtime(&path, FileTime::now()) {
            tracing::debug!("Failed to refresh cache entry mtime: {}", e);
        }
        Ok(Some(Arc::new(result)))
    }

    fn put(&self, key: &CacheKey, value: Arc<ExtractionResult>) -> Result<()> {
        let bytes = rmp_serde::to_vec_named(value.as_ref())
            .map_err(|e| DocExtractError::cache_with_source("Failed to encode cache entry", e))?;

        // Write then rename so readers never see a partial file.
        let mut file =
            tempfile::NamedTempFile::new_in(&self.directory).map_err(|e| io_error("Failed to create cache file", e))?;
        file.write_all(&bytes)
            .map_err(|e| io_error("Failed to write cache file", e))?;
        file.persist(self.entry_path(key))
            .map_err(|e| io_error("Failed to persist cache file", e.error))?;

        self.evict()
    }

    fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("Failed to remove cache entry", e)),
        }
    }

    fn clear(&self) -> Result<()> {
        for entry in self.scan()? {
            match fs::remove_file(&entry.path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_error("Failed to clear cache entry", e)),
            }
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.scan().map(|entries| entries.len()).unwrap_or(0)
    }
}
