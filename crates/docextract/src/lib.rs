//! docextract - document text extraction orchestration
//!
//! Detects the format of a document, dispatches it to the best extraction
//! backend (native parsers first, OCR engines as fallback), post-processes the
//! text and caches results so identical requests are only extracted once.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use docextract::{ExtractionConfig, extract_sync};
//!
//! # fn main() -> docextract::Result<()> {
//! let config = ExtractionConfig::default();
//! let result = extract_sync("document.pdf", &config)?;
//! println!("Extracted: {}", result.content());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core** (`core`): orchestrator, format detection, configuration, post-processing
//! - **Plugins** (`plugins`): extractor and OCR backend traits, the backend registry
//! - **Extractors** (`extractors`): PDF, Office, spreadsheet, plain text and image backends
//! - **OCR** (`ocr`): Tesseract, EasyOCR and PaddleOCR process adapters
//! - **Cache** (`cache`): content-addressed result cache with single-flight computation

#![deny(unsafe_code)]

pub mod cache;
pub mod chunking;
pub mod core;
pub mod error;
pub mod extractors;
pub mod ocr;
pub mod plugins;
pub mod text;
pub mod types;

#[cfg(feature = "pdf")]
pub mod pdf;

pub use error::{DocExtractError, Result};
pub use types::*;

pub use core::config::{CacheSettings, ConfigFile, ExtractionConfig, OcrEngine, OrchestratorConfig, RetryPolicy};
pub use core::execution::ExecutionMode;
pub use core::extractor::{
    Orchestrator, OrchestratorBuilder, default_orchestrator, extract, extract_batch, extract_batch_sync, extract_sync,
};
pub use core::formats::{FormatTag, ImageFormat};
pub use core::io::{Document, DocumentHandle};
pub use core::mime::detect;

pub use cache::{CacheBackend, CacheKey, CacheStats, DiskCache, MemoryCache, ResultCache};
pub use ocr::OcrEngineSet;
pub use plugins::{BackendRegistry, DocumentExtractor, ExtractionOutcome, OcrBackend, OcrOptions, RecognizedText};

pub use tokio_util::sync::CancellationToken;
