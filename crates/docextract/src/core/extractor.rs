//! Main extraction entry points.
//!
//! An [`Orchestrator`] drives every request through the same stages:
//!
//! ```text
//! Detecting -> CacheLookup -> CacheHit ---------------------------------------> Done
//!                          \-> CacheMiss -> Selecting -> Extracting -> PostProcessing -> CacheStore -> Done
//! ```
//!
//! Identical concurrent requests share one computation through the
//! [`ResultCache`]. Candidates are tried in registry order; `NeedsFallback`
//! moves on to the next one, transient failures are retried with backoff and
//! anything else fails the request.
//!
//! # Functions
//!
//! - [`extract`] / [`extract_sync`] - one document through the default orchestrator
//! - [`extract_batch`] / [`extract_batch_sync`] - many documents, one result per input

use crate::cache::{CacheBackend, CacheKey, DiskCache, MemoryCache, ResultCache};
use crate::chunking::Chunker;
use crate::core::config::{ConfigFile, ExtractionConfig, OrchestratorConfig};
use crate::core::execution::{ExecutionMode, run_blocking, with_execution_mode};
use crate::core::io::{Document, DocumentHandle};
use crate::core::mime;
use crate::core::pipeline::PostProcessor;
use crate::error::Stage;
use crate::extractors::Extractor;
use crate::ocr::OcrEngineSet;
#[cfg(feature = "pdf")]
use crate::pdf::{PageRasterizer, PdftoppmRasterizer};
use crate::plugins::{BackendRegistry, DocumentExtractor, ExtractionOutcome};
use crate::types::ExtractionResult;
use crate::{DocExtractError, Result};
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Global Tokio runtime for synchronous operations.
///
/// Lazily initialized on first use and shared by all sync wrappers.
///
/// # Safety
///
/// The `.expect()` is justified because runtime creation only fails on
/// resource exhaustion, in which case nothing else would work either.
static GLOBAL_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create global Tokio runtime - system may be out of resources")
});

/// Process-wide orchestrator behind the free functions, configured from a
/// discovered `docextract.toml` when one exists.
static DEFAULT_ORCHESTRATOR: Lazy<Result<Orchestrator>> = Lazy::new(|| {
    let config = match ConfigFile::discover() {
        Ok(Some(file)) => file.orchestrator,
        Ok(None) => OrchestratorConfig::default(),
        Err(e) => {
            tracing::warn!("Ignoring unreadable config file: {}", e);
            OrchestratorConfig::default()
        }
    };
    Orchestrator::builder().config(config).build()
});

/// The lazily built process-wide orchestrator.
pub fn default_orchestrator() -> Result<Orchestrator> {
    DEFAULT_ORCHESTRATOR.as_ref().cloned().map_err(Clone::clone)
}

struct OrchestratorInner {
    config: OrchestratorConfig,
    registry: BackendRegistry,
    ocr: Arc<OcrEngineSet>,
    cache: ResultCache,
    post_processor: PostProcessor,
}

/// Extraction engine. Cheap to clone; clones share registry, engines and cache.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .field("ocr", &self.inner.ocr)
            .field("cache", &self.inner.cache)
            .finish()
    }
}

/// Builder for [`Orchestrator`].
///
/// # Example
///
/// ```rust,no_run
/// use docextract::{ExtractionConfig, Orchestrator, OrchestratorConfig};
///
/// # async fn example() -> docextract::Result<()> {
/// let orchestrator = Orchestrator::builder()
///     .config(OrchestratorConfig::default())
///     .build()?;
/// let result = orchestrator.extract("report.pdf", &ExtractionConfig::default()).await?;
/// println!("{}", result.content());
/// # Ok(())
/// # }
/// ```
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    ocr: Option<OcrEngineSet>,
    #[cfg(feature = "pdf")]
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    chunker: Option<Arc<dyn Chunker>>,
    cache_backend: Option<Arc<dyn CacheBackend>>,
    extractors: Vec<Arc<dyn DocumentExtractor>>,
    builtin_extractors: bool,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self {
            config: OrchestratorConfig::default(),
            ocr: None,
            #[cfg(feature = "pdf")]
            rasterizer: None,
            chunker: None,
            cache_backend: None,
            extractors: Vec::new(),
            builtin_extractors: true,
        }
    }
}

impl OrchestratorBuilder {
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// OCR engines; defaults to [`OcrEngineSet::with_process_engines`].
    pub fn ocr_engines(mut self, engines: OcrEngineSet) -> Self {
        self.ocr = Some(engines);
        self
    }

    /// Page renderer for OCR of PDFs; defaults to `pdftoppm`.
    #[cfg(feature = "pdf")]
    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    /// Chunker used when chunking is enabled; defaults to fixed windows.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Cache storage; defaults to a disk cache when `cache.directory` is set
    /// and to an in-memory LRU otherwise.
    pub fn cache_backend(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache_backend = Some(backend);
        self
    }

    /// Register a custom extractor after the built-ins.
    pub fn extractor(mut self, extractor: Arc<dyn DocumentExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// Whether to register the built-in extractors (default `true`).
    pub fn builtin_extractors(mut self, enabled: bool) -> Self {
        self.builtin_extractors = enabled;
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        self.config.validate()?;

        let ocr = Arc::new(self.ocr.unwrap_or_default());
        ocr.initialize_all()?;

        let mut registry = if self.builtin_extractors {
            #[cfg(feature = "pdf")]
            {
                let rasterizer = self
                    .rasterizer
                    .unwrap_or_else(|| Arc::new(PdftoppmRasterizer::default()));
                BackendRegistry::with_defaults(Arc::clone(&ocr), rasterizer)?
            }
            #[cfg(not(feature = "pdf"))]
            {
                BackendRegistry::with_defaults(Arc::clone(&ocr))?
            }
        } else {
            BackendRegistry::new()
        };
        for extractor in self.extractors {
            registry.register(Extractor::custom(extractor))?;
        }

        let backend: Arc<dyn CacheBackend> = match self.cache_backend {
            Some(backend) => backend,
            None => match DiskCache::from_settings(&self.config.cache)? {
                Some(disk) => Arc::new(disk),
                None => Arc::new(MemoryCache::from_settings(&self.config.cache)),
            },
        };

        let post_processor = match self.chunker {
            Some(chunker) => PostProcessor::new(chunker),
            None => PostProcessor::default(),
        };

        tracing::debug!(
            "Built orchestrator with extractors {:?} and {} cache",
            registry.names(),
            backend.name()
        );

        Ok(Orchestrator {
            inner: Arc::new(OrchestratorInner {
                config: self.config,
                registry,
                ocr,
                cache: ResultCache::new(backend),
                post_processor,
            }),
        })
    }
}

impl Orchestrator {
    /// Orchestrator with default configuration, engines and extractors.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.inner.registry
    }

    pub fn ocr_engines(&self) -> &Arc<OcrEngineSet> {
        &self.inner.ocr
    }

    pub fn cache(&self) -> &ResultCache {
        &self.inner.cache
    }

    /// Notify extractors and OCR engines that the orchestrator is going away.
    pub fn shutdown(&self) -> Result<()> {
        self.inner.registry.shutdown_all()?;
        self.inner.ocr.shutdown_all()
    }

    /// Extract text from one document.
    ///
    /// # Errors
    ///
    /// - `Validation` for an invalid config
    /// - `Io` when a path source cannot be read
    /// - `UnsupportedFormat` when no extractor serves the format or every candidate fell back
    /// - `Extraction` / `OcrEngine` from the extractor that failed
    pub async fn extract(
        &self,
        source: impl Into<DocumentHandle>,
        config: &ExtractionConfig,
    ) -> Result<ExtractionResult> {
        self.extract_shared(source.into(), config)
            .await
            .map(Arc::unwrap_or_clone)
    }

    /// Like [`Orchestrator::extract`], returning the cached result without copying it.
    pub async fn extract_shared(
        &self,
        handle: DocumentHandle,
        config: &ExtractionConfig,
    ) -> Result<Arc<ExtractionResult>> {
        with_execution_mode(self.inner.config.execution_mode, self.run(handle, config)).await
    }

    /// Extract, giving up with `Cancelled` as soon as `token` fires.
    ///
    /// Cancellation drops the in-flight work: engine processes are killed and
    /// nothing is cached.
    pub async fn extract_with_cancellation(
        &self,
        source: impl Into<DocumentHandle>,
        config: &ExtractionConfig,
        token: CancellationToken,
    ) -> Result<ExtractionResult> {
        let handle = source.into();
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("Extraction cancelled by caller");
                Err(DocExtractError::Cancelled)
            }
            result = self.extract(handle, config) => result,
        }
    }

    /// Blocking variant of [`Orchestrator::extract`] on the global runtime.
    ///
    /// Must not be called from within an async context.
    pub fn extract_sync(&self, source: impl Into<DocumentHandle>, config: &ExtractionConfig) -> Result<ExtractionResult> {
        let handle = source.into();
        GLOBAL_RUNTIME.block_on(self.extract(handle, config))
    }

    /// Extract many documents; the output has one entry per input, in order.
    ///
    /// A failure, or a panic, in one item only affects that item's slot.
    #[tracing::instrument(skip_all, fields(batch_size = sources.len()))]
    pub async fn extract_batch(
        &self,
        sources: Vec<DocumentHandle>,
        config: &ExtractionConfig,
    ) -> Vec<Result<ExtractionResult>> {
        if sources.is_empty() {
            return Vec::new();
        }
        let limit = self.inner.config.concurrency_limit();

        match self.inner.config.execution_mode {
            ExecutionMode::Parallel => self.batch_parallel(sources, config, limit).await,
            ExecutionMode::Cooperative => {
                stream::iter(sources.into_iter().map(|handle| catch_panics(self.extract(handle, config))))
                    .buffered(limit)
                    .collect()
                    .await
            }
        }
    }

    pub fn extract_batch_sync(&self, sources: Vec<DocumentHandle>, config: &ExtractionConfig) -> Vec<Result<ExtractionResult>> {
        GLOBAL_RUNTIME.block_on(self.extract_batch(sources, config))
    }

    async fn batch_parallel(
        &self,
        sources: Vec<DocumentHandle>,
        config: &ExtractionConfig,
        limit: usize,
    ) -> Vec<Result<ExtractionResult>> {
        let config = Arc::new(config.clone());
        let semaphore = Arc::new(Semaphore::new(limit));
        let total = sources.len();
        let mut tasks = JoinSet::new();

        for (index, handle) in sources.into_iter().enumerate() {
            let orchestrator = self.clone();
            let config = Arc::clone(&config);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let outcome = catch_panics(async {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|e| DocExtractError::Other(format!("Batch semaphore closed: {e}")))?;
                    orchestrator.extract(handle, &config).await
                })
                .await;
                (index, outcome)
            });
        }

        let mut results: Vec<Option<Result<ExtractionResult>>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => results[index] = Some(outcome),
                Err(e) => tracing::warn!("Batch task failed to join: {}", e),
            }
        }

        results
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err(DocExtractError::Other("Extraction task did not complete".to_string()))))
            .collect()
    }

    #[tracing::instrument(level = "debug", skip_all, fields(source = handle.name_hint().unwrap_or("<bytes>")))]
    async fn run(&self, handle: DocumentHandle, config: &ExtractionConfig) -> Result<Arc<ExtractionResult>> {
        config.validate()?;

        let content = handle.read().await?;
        let name = handle.name_hint().map(str::to_string);
        let format = mime::detect(&content, name.as_deref());
        tracing::debug!(stage = ?Stage::Detecting, %format, bytes = content.len(), "Format detected");
        let doc = Document::new(content, name, format);

        if !config.cache_enabled {
            return self.compute(&doc, config).await.map(Arc::new);
        }

        let key = self.cache_key(&doc, config).await?;
        tracing::debug!(stage = ?Stage::CacheLookup, %format, %key, "Looking up cache");
        let result = self
            .inner
            .cache
            .get_or_compute(&key, || self.compute(&doc, config))
            .await?;
        tracing::debug!(%format, %key, "Extraction done");
        Ok(result)
    }

    async fn cache_key(&self, doc: &Document, config: &ExtractionConfig) -> Result<CacheKey> {
        let engine_version = if self.inner.config.strict_engine_versioning
            && self
                .inner
                .registry
                .candidates(doc.format)
                .iter()
                .any(|d| d.requires_ocr)
        {
            let ocr = Arc::clone(&self.inner.ocr);
            let engine = config.ocr_engine;
            run_blocking(move || Ok(ocr.version(engine))).await?
        } else {
            None
        };

        let content = Arc::clone(&doc.content);
        let format = doc.format;
        let config = config.clone();
        run_blocking(move || CacheKey::new(&content, format, &config, engine_version.as_deref())).await
    }

    /// Selecting, Extracting and PostProcessing for a cache miss.
    async fn compute(&self, doc: &Document, config: &ExtractionConfig) -> Result<ExtractionResult> {
        let registry = &self.inner.registry;
        let mut candidates: Vec<(bool, Arc<Extractor>)> = registry
            .candidates(doc.format)
            .iter()
            .map(|d| d.requires_ocr)
            .zip(registry.resolve(doc.format))
            .collect();

        if config.force_ocr && candidates.iter().any(|(ocr, _)| *ocr) {
            candidates.retain(|(ocr, _)| *ocr);
        }
        if candidates.is_empty() {
            return Err(DocExtractError::UnsupportedFormat(format!(
                "no extractor registered for {}",
                doc.format
            )));
        }
        tracing::debug!(
            stage = ?Stage::Selecting,
            format = %doc.format,
            candidates = ?candidates.iter().map(|(_, e)| e.name()).collect::<Vec<_>>(),
            "Candidates selected"
        );

        let mut fallback_reasons = Vec::new();
        for (_, extractor) in candidates {
            tracing::debug!(stage = ?Stage::Extracting, format = %doc.format, extractor = extractor.name(), "Extracting");
            match self.attempt(&extractor, doc, config).await? {
                ExtractionOutcome::Extracted(raw) => {
                    tracing::debug!(stage = ?Stage::PostProcessing, format = %doc.format, "Post-processing");
                    let post_processor = self.inner.post_processor.clone();
                    let doc = doc.clone();
                    let config = config.clone();
                    let name = extractor.name().to_string();
                    return run_blocking(move || Ok(post_processor.process(raw, &doc, &config, &name))).await;
                }
                ExtractionOutcome::NeedsFallback { reason } => {
                    tracing::debug!("{} needs fallback: {}", extractor.name(), reason);
                    fallback_reasons.push(format!("{}: {}", extractor.name(), reason));
                }
            }
        }

        Err(DocExtractError::UnsupportedFormat(format!(
            "{} could not be extracted ({})",
            doc.format,
            fallback_reasons.join("; ")
        )))
    }

    /// Run one extractor under the per-attempt timeout, retrying transient failures.
    async fn attempt(&self, extractor: &Extractor, doc: &Document, config: &ExtractionConfig) -> Result<ExtractionOutcome> {
        let policy = &self.inner.config.retry;
        let mut attempt = 1;

        loop {
            let outcome = match tokio::time::timeout(config.timeout(), extractor.extract(doc, config)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(DocExtractError::timeout(config.timeout_seconds)),
            };

            match outcome {
                Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                    let delay = policy.backoff(attempt);
                    tracing::warn!(
                        "{} attempt {}/{} failed, retrying in {:?}: {}",
                        extractor.name(),
                        attempt,
                        policy.max_attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

/// Turn a panic inside `future` into an `Other` error.
async fn catch_panics<F>(future: F) -> Result<ExtractionResult>
where
    F: std::future::Future<Output = Result<ExtractionResult>>,
{
    AssertUnwindSafe(future).catch_unwind().await.unwrap_or_else(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(DocExtractError::Other(format!("Extraction panicked: {message}")))
    })
}

/// Extract one document with the default orchestrator.
pub async fn extract(source: impl Into<DocumentHandle>, config: &ExtractionConfig) -> Result<ExtractionResult> {
    default_orchestrator()?.extract(source, config).await
}

/// Synchronous wrapper for [`extract`].
pub fn extract_sync(source: impl Into<DocumentHandle>, config: &ExtractionConfig) -> Result<ExtractionResult> {
    default_orchestrator()?.extract_sync(source, config)
}

/// Extract many documents with the default orchestrator.
///
/// Fails as a whole only when the default orchestrator cannot be built.
pub async fn extract_batch(
    sources: Vec<DocumentHandle>,
    config: &ExtractionConfig,
) -> Result<Vec<Result<ExtractionResult>>> {
    Ok(default_orchestrator()?.extract_batch(sources, config).await)
}

/// Synchronous wrapper for [`extract_batch`].
pub fn extract_batch_sync(sources: Vec<DocumentHandle>, config: &ExtractionConfig) -> Result<Vec<Result<ExtractionResult>>> {
    Ok(default_orchestrator()?.extract_batch_sync(sources, config))
}
