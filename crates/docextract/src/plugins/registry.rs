//! Backend registry: which extractors may serve a format, and in what order.
//!
//! Candidate order for a format is fixed when the registry is built:
//! native extractors before OCR-based ones, then priority descending, then
//! registration order. The orchestrator owns one registry and never mutates
//! it after construction.

use crate::core::formats::FormatTag;
use crate::extractors::Extractor;
use crate::{DocExtractError, Result};
use indexmap::IndexMap;
use std::sync::Arc;

#[cfg(feature = "pdf")]
use crate::pdf::PageRasterizer;
use crate::ocr::OcrEngineSet;

/// Registration record of one extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorDescriptor {
    pub name: String,
    pub formats: Vec<FormatTag>,
    /// Higher runs first among extractors of the same kind.
    pub priority: i32,
    pub requires_ocr: bool,
}

impl ExtractorDescriptor {
    pub fn supports(&self, tag: FormatTag) -> bool {
        self.formats.contains(&tag)
    }
}

struct Registration {
    descriptor: ExtractorDescriptor,
    extractor: Arc<Extractor>,
}

/// Validate an extractor name before registration.
///
/// # Rules
///
/// - Name cannot be empty
/// - Name cannot contain whitespace
fn validate_extractor_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DocExtractError::validation("Extractor name cannot be empty"));
    }
    if name.contains(char::is_whitespace) {
        return Err(DocExtractError::validation(format!(
            "Extractor name '{name}' cannot contain whitespace"
        )));
    }
    Ok(())
}

/// Priority table mapping format tags to extractors.
#[derive(Default)]
pub struct BackendRegistry {
    entries: IndexMap<String, Registration>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("extractors", &self.names())
            .finish()
    }
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in extractor enabled by crate features.
    #[cfg(feature = "pdf")]
    pub fn with_defaults(ocr: Arc<OcrEngineSet>, rasterizer: Arc<dyn PageRasterizer>) -> Result<Self> {
        use crate::extractors::{PdfOcrExtractor, PdfTextExtractor};

        let mut registry = Self::with_native_defaults()?;
        registry.register(Extractor::PdfText(PdfTextExtractor))?;
        registry.register(Extractor::PdfOcr(PdfOcrExtractor::new(Arc::clone(&ocr), rasterizer)))?;
        registry.register(Extractor::ImageOcr(crate::extractors::ImageOcrExtractor::new(ocr)))?;
        Ok(registry)
    }

    /// Registry with every built-in extractor enabled by crate features.
    #[cfg(not(feature = "pdf"))]
    pub fn with_defaults(ocr: Arc<OcrEngineSet>) -> Result<Self> {
        let mut registry = Self::with_native_defaults()?;
        registry.register(Extractor::ImageOcr(crate::extractors::ImageOcrExtractor::new(ocr)))?;
        Ok(registry)
    }

    fn with_native_defaults() -> Result<Self> {
        let mut registry = Self::new();
        #[cfg(feature = "office")]
        {
            registry.register(Extractor::Docx(crate::extractors::DocxExtractor))?;
            registry.register(Extractor::Pptx(crate::extractors::PptxExtractor))?;
        }
        #[cfg(feature = "excel")]
        registry.register(Extractor::Spreadsheet(crate::extractors::SpreadsheetExtractor))?;
        registry.register(Extractor::PlainText(crate::extractors::PlainTextExtractor))?;
        Ok(registry)
    }

    /// Register an extractor.
    ///
    /// # Errors
    ///
    /// `Validation` when the name is empty, contains whitespace or is taken;
    /// any error from the extractor's `initialize`.
    pub fn register(&mut self, extractor: Extractor) -> Result<()> {
        let descriptor = extractor.descriptor();
        validate_extractor_name(&descriptor.name)?;
        if self.entries.contains_key(&descriptor.name) {
            return Err(DocExtractError::validation(format!(
                "Extractor '{}' is already registered",
                descriptor.name
            )));
        }

        extractor.initialize()?;
        tracing::debug!(
            "Registered extractor '{}' for {:?} (priority {}, ocr {})",
            descriptor.name,
            descriptor.formats,
            descriptor.priority,
            descriptor.requires_ocr
        );
        self.entries.insert(
            descriptor.name.clone(),
            Registration {
                descriptor,
                extractor: Arc::new(extractor),
            },
        );
        Ok(())
    }

    /// Remove an extractor and shut it down. Unknown names are ignored.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        match self.entries.shift_remove(name) {
            Some(registration) => registration.extractor.shutdown(),
            None => Ok(()),
        }
    }

    pub fn shutdown_all(&self) -> Result<()> {
        for registration in self.entries.values() {
            registration.extractor.shutdown()?;
        }
        Ok(())
    }

    fn ordered(&self, tag: FormatTag) -> Vec<&Registration> {
        let mut matching: Vec<&Registration> = self
            .entries
            .values()
            .filter(|r| r.descriptor.supports(tag))
            .collect();
        // Stable: equal keys keep registration order.
        matching.sort_by_key(|r| (r.descriptor.requires_ocr, std::cmp::Reverse(r.descriptor.priority)));
        matching
    }

    /// Descriptors able to serve `tag`, in attempt order. Empty for unknown tags.
    pub fn candidates(&self, tag: FormatTag) -> Vec<&ExtractorDescriptor> {
        self.ordered(tag).into_iter().map(|r| &r.descriptor).collect()
    }

    /// Extractors able to serve `tag`, in attempt order.
    pub fn resolve(&self, tag: FormatTag) -> Vec<Arc<Extractor>> {
        self.ordered(tag)
            .into_iter()
            .map(|r| Arc::clone(&r.extractor))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Extractor>> {
        self.entries.get(name).map(|r| Arc::clone(&r.extractor))
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
