//! Result cache with single-flight coalescing.
//!
//! Keys are derived from content, detected format and the full extraction
//! config, so a cached result is only ever served for the exact request that
//! produced it. [`ResultCache`] layers single-flight over any
//! [`CacheBackend`]: concurrent callers asking for the same key wait on one
//! computation instead of starting their own.
//!
//! # Failure handling
//!
//! The cache is an optimization. Backend errors are logged and treated as a
//! miss on lookup or a skipped store; they never fail a request. Only a
//! successful computation is stored, so a cancelled or failed leader leaves
//! nothing behind.

pub mod disk;
pub mod memory;

pub use disk::DiskCache;
pub use memory::MemoryCache;

use crate::core::config::ExtractionConfig;
use crate::core::formats::FormatTag;
use crate::error::{DocExtractError, Result};
use crate::types::ExtractionResult;
use ahash::AHashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Hex SHA-256 identifying one (content, format, config) request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a request.
    ///
    /// `engine_version` is folded in when strict engine versioning is on, so
    /// upgrading an OCR engine invalidates its results.
    pub fn new(
        content: &[u8],
        format: FormatTag,
        config: &ExtractionConfig,
        engine_version: Option<&str>,
    ) -> Result<Self> {
        let content_digest = Sha256::digest(content);

        let mut hasher = Sha256::new();
        hasher.update(content_digest);
        hasher.update([0u8]);
        hasher.update(format.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(config.fingerprint()?);
        if let Some(version) = engine_version {
            hasher.update([0u8]);
            hasher.update(version.as_bytes());
        }
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Wrap an existing digest, e.g. a file name read back from a disk cache.
    pub fn from_digest(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage behind a [`ResultCache`].
///
/// Implementations bound their own size and evict on their own; nothing
/// else removes entries.
pub trait CacheBackend: Send + Sync {
    fn name(&self) -> &str;

    fn get(&self, key: &CacheKey) -> Result<Option<Arc<ExtractionResult>>>;

    fn put(&self, key: &CacheKey, value: Arc<ExtractionResult>) -> Result<()>;

    /// Remove one entry; `true` if it existed.
    fn invalidate(&self, key: &CacheKey) -> Result<bool>;

    fn clear(&self) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counters describing cache behaviour since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Requests that waited on another caller's computation.
    pub coalesced: u64,
    pub stores: u64,
    /// Backend errors that were logged and ignored.
    pub backend_errors: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    stores: AtomicU64,
    backend_errors: AtomicU64,
}

type SharedOutcome = Result<Arc<ExtractionResult>>;
type InFlight = watch::Receiver<Option<SharedOutcome>>;

enum Role {
    Leader(watch::Sender<Option<SharedOutcome>>),
    Follower(InFlight),
}

/// Removes the in-flight marker when the leader finishes or is dropped.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<AHashMap<CacheKey, InFlight>>,
    key: &'a CacheKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(self.key);
    }
}

/// Single-flight front of a [`CacheBackend`].
pub struct ResultCache {
    backend: Arc<dyn CacheBackend>,
    in_flight: Mutex<AHashMap<CacheKey, InFlight>>,
    counters: Counters,
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("backend", &self.backend.name())
            .field("entries", &self.backend.len())
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}

impl ResultCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            in_flight: Mutex::new(AHashMap::new()),
            counters: Counters::default(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Backend lookup; errors count as a miss.
    pub fn lookup(&self, key: &CacheKey) -> Option<Arc<ExtractionResult>> {
        match self.backend.get(key) {
            Ok(hit) => hit,
            Err(e) => {
                self.counters.backend_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Cache lookup for {} failed, treating as miss: {}", key, e);
                None
            }
        }
    }

    /// Backend store; errors are logged and swallowed.
    pub fn store(&self, key: &CacheKey, value: Arc<ExtractionResult>) {
        match self.backend.put(key, value) {
            Ok(()) => {
                self.counters.stores.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.backend_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Cache store for {} failed, result not cached: {}", key, e);
            }
        }
    }

    pub fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        self.backend.invalidate(key)
    }

    pub fn clear(&self) -> Result<()> {
        self.backend.clear()
    }

    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            stores: self.counters.stores.load(Ordering::Relaxed),
            backend_errors: self.counters.backend_errors.load(Ordering::Relaxed),
        }
    }

    /// Return the cached result for `key`, or compute it exactly once across
    /// concurrent callers.
    ///
    /// The first caller to miss becomes the leader and runs `compute`;
    /// callers arriving meanwhile wait for the leader's outcome, error
    /// included. If the leader is dropped before finishing, its waiters start
    /// over and one of them takes the lead. `compute` runs at most once per
    /// call.
    pub async fn get_or_compute<F, Fut>(&self, key: &CacheKey, compute: F) -> Result<Arc<ExtractionResult>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ExtractionResult>>,
    {
        let mut compute = Some(compute);
        let mut waited = false;

        loop {
            if let Some(hit) = self.lookup(key) {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Cache hit for {}", key);
                return Ok(hit);
            }

            let role = {
                let mut in_flight = self.in_flight.lock();
                match in_flight.get(key) {
                    Some(receiver) => Role::Follower(receiver.clone()),
                    None => {
                        let (sender, receiver) = watch::channel(None);
                        in_flight.insert(key.clone(), receiver);
                        Role::Leader(sender)
                    }
                }
            };

            match role {
                Role::Follower(mut receiver) => {
                    if !waited {
                        waited = true;
                        self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!("Waiting on in-flight extraction for {}", key);
                    }
                    if let Some(outcome) = wait_for_leader(&mut receiver).await {
                        return outcome;
                    }
                    tracing::debug!("Leader for {} went away, retrying", key);
                }
                Role::Leader(sender) => {
                    let _guard = InFlightGuard {
                        in_flight: &self.in_flight,
                        key,
                    };

                    // A leader that finished between our lookup and taking the lead
                    // has already stored its result.
                    if let Some(hit) = self.lookup(key) {
                        self.counters.hits.fetch_add(1, Ordering::Relaxed);
                        sender.send_replace(Some(Ok(Arc::clone(&hit))));
                        return Ok(hit);
                    }

                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Cache miss for {}, computing", key);
                    let compute = compute
                        .take()
                        .ok_or_else(|| DocExtractError::Other("cache computation already consumed".to_string()))?;

                    let outcome = compute().await.map(Arc::new);
                    if let Ok(result) = &outcome {
                        self.store(key, Arc::clone(result));
                    }
                    sender.send_replace(Some(outcome.clone()));
                    return outcome;
                }
            }
        }
    }
}

/// The leader's outcome, or `None` if it was dropped without one.
async fn wait_for_leader(receiver: &mut InFlight) -> Option<SharedOutcome> {
    loop {
        if let Some(outcome) = receiver.borrow_and_update().clone() {
            return Some(outcome);
        }
        if receiver.changed().await.is_err() {
            return receiver.borrow().clone();
        }
    }
}
