//! Extension points.
//!
//! - [`DocumentExtractor`]: custom extractors wrapped by `Extractor::Custom`
//! - [`OcrBackend`]: OCR engine adapters collected in an `OcrEngineSet`
//! - [`BackendRegistry`]: the priority table mapping formats to extractors
//!
//! Every extension implements [`Plugin`] for naming, versioning and lifecycle.

pub mod extractor;
pub mod ocr;
pub mod registry;
pub mod traits;

pub use extractor::{DocumentExtractor, ExtractionOutcome};
pub use ocr::{OcrBackend, OcrOptions, RecognizedText};
pub use registry::{BackendRegistry, ExtractorDescriptor};
pub use traits::Plugin;
