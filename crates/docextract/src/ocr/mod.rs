//! OCR engine adapters.
//!
//! Engines run as external processes:
//!
//! - [`TesseractBackend`]: the `tesseract` CLI, TSV output
//! - [`EasyOcrBackend`], [`PaddleOcrBackend`]: Python packages driven through `python3`
//!
//! They are collected in an [`OcrEngineSet`] that is constructed once, shared
//! by the OCR extractors behind an `Arc`, and serializes engines that are not
//! safe to call concurrently.

pub mod easyocr;
pub mod paddleocr;
pub mod process;
pub mod python;
pub mod tesseract;
pub mod validation;

pub use easyocr::EasyOcrBackend;
pub use paddleocr::PaddleOcrBackend;
pub use tesseract::TesseractBackend;

use crate::core::config::{ExtractionConfig, OcrEngine};
use crate::error::{DocExtractError, Result};
use crate::plugins::{OcrBackend, OcrOptions, RecognizedText};
use ahash::AHashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

struct EngineSlot {
    backend: Arc<dyn OcrBackend>,
    /// Single permit for engines that must not run concurrently.
    gate: Option<Arc<Semaphore>>,
}

/// The OCR engines available to an orchestrator, keyed by engine kind.
pub struct OcrEngineSet {
    engines: AHashMap<OcrEngine, EngineSlot>,
}

impl std::fmt::Debug for OcrEngineSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.engines.keys().map(OcrEngine::as_str).collect();
        names.sort_unstable();
        f.debug_struct("OcrEngineSet").field("engines", &names).finish()
    }
}

impl Default for OcrEngineSet {
    fn default() -> Self {
        Self::with_process_engines()
    }
}

impl OcrEngineSet {
    pub fn empty() -> Self {
        Self {
            engines: AHashMap::new(),
        }
    }

    /// Tesseract, EasyOCR and PaddleOCR with default settings.
    pub fn with_process_engines() -> Self {
        let mut set = Self::empty();
        set.register(Arc::new(TesseractBackend::new()));
        set.register(Arc::new(EasyOcrBackend::new()));
        set.register(Arc::new(PaddleOcrBackend::new()));
        set
    }

    /// Install `backend` for its engine kind, replacing any previous one.
    pub fn register(&mut self, backend: Arc<dyn OcrBackend>) {
        let engine = backend.engine();
        let gate = (!backend.is_concurrent_safe()).then(|| Arc::new(Semaphore::new(1)));
        self.engines.insert(engine, EngineSlot { backend, gate });
    }

    pub fn with_backend(mut self, backend: Arc<dyn OcrBackend>) -> Self {
        self.register(backend);
        self
    }

    pub fn get(&self, engine: OcrEngine) -> Option<Arc<dyn OcrBackend>> {
        self.engines.get(&engine).map(|slot| Arc::clone(&slot.backend))
    }

    pub fn contains(&self, engine: OcrEngine) -> bool {
        self.engines.contains_key(&engine)
    }

    /// Engine version for cache keys, `None` for unregistered engines.
    pub fn version(&self, engine: OcrEngine) -> Option<String> {
        self.engines.get(&engine).map(|slot| slot.backend.version())
    }

    /// Language and timeout settings for one call to `engine`.
    pub fn options_for(&self, engine: OcrEngine, config: &ExtractionConfig) -> Result<OcrOptions> {
        let slot = self.slot(engine)?;
        let selection = validation::resolve_languages(slot.backend.as_ref(), &config.language_hints);
        if !selection.rejected.is_empty() {
            tracing::warn!(
                "{} does not support language hints {:?}; using {:?}",
                engine,
                selection.rejected,
                selection.languages
            );
        }
        Ok(OcrOptions {
            languages: selection.languages,
            timeout: config.timeout(),
        })
    }

    /// Recognize one image with the engine chosen in `config`.
    pub async fn recognize(&self, image: &[u8], config: &ExtractionConfig) -> Result<Vec<RecognizedText>> {
        let engine = config.ocr_engine;
        let slot = self.slot(engine)?;
        let options = self.options_for(engine, config)?;

        let _permit = match &slot.gate {
            Some(gate) => Some(
                gate.acquire()
                    .await
                    .map_err(|e| DocExtractError::Other(format!("OCR engine gate closed: {e}")))?,
            ),
            None => None,
        };

        tracing::debug!("Running {} on {} bytes with {:?}", engine, image.len(), options.languages);
        slot.backend.recognize(image, &options).await
    }

    pub fn initialize_all(&self) -> Result<()> {
        for slot in self.engines.values() {
            slot.backend.initialize()?;
        }
        Ok(())
    }

    pub fn shutdown_all(&self) -> Result<()> {
        for slot in self.engines.values() {
            slot.backend.shutdown()?;
        }
        Ok(())
    }

    fn slot(&self, engine: OcrEngine) -> Result<&EngineSlot> {
        self.engines
            .get(&engine)
            .ok_or_else(|| DocExtractError::missing_binary(engine.as_str(), "no adapter registered for this engine"))
    }
}
