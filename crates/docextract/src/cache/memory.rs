//! In-process LRU cache bounded by entry count and optionally by bytes.

use crate::cache::{CacheBackend, CacheKey};
use crate::core::config::CacheSettings;
use crate::error::Result;
use crate::types::ExtractionResult;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct MemoryEntry {
    value: Arc<ExtractionResult>,
    size: usize,
    created_at: Instant,
}

#[derive(Default)]
struct MemoryState {
    /// Least recently used first.
    entries: IndexMap<CacheKey, MemoryEntry>,
    bytes: usize,
}

impl MemoryState {
    fn remove_index(&mut self, index: usize) {
        if let Some((_, entry)) = self.entries.shift_remove_index(index) {
            self.bytes -= entry.size;
        }
    }
}

pub struct MemoryCache {
    state: Mutex<MemoryState>,
    max_entries: usize,
    max_bytes: Option<usize>,
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryCache")
            .field("entries", &state.entries.len())
            .field("bytes", &state.bytes)
            .field("max_entries", &self.max_entries)
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::from_settings(&CacheSettings::default())
    }
}

impl MemoryCache {
    pub fn new(max_entries: usize, max_bytes: Option<usize>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            max_entries: max_entries.max(1),
            max_bytes,
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.max_entries, settings.max_bytes)
    }

    /// Summed approximate size of cached results.
    pub fn size_bytes(&self) -> usize {
        self.state.lock().bytes
    }

    /// Time since `key` was stored.
    pub fn entry_age(&self, key: &CacheKey) -> Option<Duration> {
        self.state.lock().entries.get(key).map(|e| e.created_at.elapsed())
    }

    fn over_capacity(&self, state: &MemoryState) -> bool {
        state.entries.len() > self.max_entries || self.max_bytes.is_some_and(|max| state.bytes > max)
    }
}

impl CacheBackend for MemoryCache {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Arc<ExtractionResult>>> {
        let mut state = self.state.lock();
        let Some(index) = state.entries.get_index_of(key) else {
            return Ok(None);
        };
        let last = state.entries.len() - 1;
        state.entries.move_index(index, last);
        Ok(state.entries.get_index(last).map(|(_, e)| Arc::clone(&e.value)))
    }

    fn put(&self, key: &CacheKey, value: Arc<ExtractionResult>) -> Result<()> {
        let size = value.approximate_size();
        if self.max_bytes.is_some_and(|max| size > max) {
            tracing::debug!("Result for {} ({} bytes) exceeds the cache byte bound", key, size);
            return Ok(());
        }

        let mut state = self.state.lock();
        if let Some(index) = state.entries.get_index_of(key) {
            state.remove_index(index);
        }
        state.bytes += size;
        state.entries.insert(
            key.clone(),
            MemoryEntry {
                value,
                size,
                created_at: Instant::now(),
            },
        );

        while self.over_capacity(&state) && state.entries.len() > 1 {
            if let Some((evicted, _)) = state.entries.get_index(0) {
                tracing::debug!("Evicting {} from memory cache", evicted);
            }
            state.remove_index(0);
        }
        Ok(())
    }

    fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        let mut state = self.state.lock();
        match state.entries.get_index_of(key) {
            Some(index) => {
                state.remove_index(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn clear(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.entries.clear();
        state.bytes = 0;
        Ok(())
    }

    fn len(&self) -> usize {
        self.state.lock().entries.len()
    }
}
