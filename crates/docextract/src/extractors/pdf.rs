//! PDF extractors: the native text layer first, OCR over rendered pages second.

use crate::core::config::{ExtractionConfig, OcrEngine};
use crate::core::execution::run_blocking;
use crate::core::io::Document;
use crate::error::Result;
use crate::extractors::image::segment_from_lines;
use crate::ocr::OcrEngineSet;
use crate::pdf::rendering::{DEFAULT_DPI, PageRasterizer};
use crate::pdf::text::{extract_pdf_text, unusable_layer_reason};
use crate::plugins::ExtractionOutcome;
use crate::types::{RawExtraction, TextSegment};
use std::sync::Arc;

/// Reads the embedded text layer with `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub const NAME: &'static str = "pdf-text";

    /// Falls back when the layer is missing or unusable, e.g. a scanned document.
    pub async fn extract(&self, doc: &Document, _config: &ExtractionConfig) -> Result<ExtractionOutcome> {
        let bytes = doc.content.clone();
        let pdf = run_blocking(move || extract_pdf_text(&bytes)).await?;

        if let Some(reason) = unusable_layer_reason(&pdf) {
            tracing::debug!("Native PDF text rejected: {}", reason);
            return Ok(ExtractionOutcome::fallback(reason));
        }

        let segments = pdf
            .pages
            .into_iter()
            .map(|(page, text)| TextSegment::on_page(text, page))
            .collect();
        Ok(ExtractionOutcome::Extracted(RawExtraction {
            segments,
            metadata: pdf.metadata,
            tables: None,
        }))
    }
}

/// Rasterizes every page and runs OCR on each, in page order.
#[derive(Clone)]
pub struct PdfOcrExtractor {
    ocr: Arc<OcrEngineSet>,
    rasterizer: Arc<dyn PageRasterizer>,
    dpi: u32,
}

impl std::fmt::Debug for PdfOcrExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfOcrExtractor")
            .field("ocr", &self.ocr)
            .field("rasterizer", &self.rasterizer.name())
            .field("dpi", &self.dpi)
            .finish()
    }
}

impl PdfOcrExtractor {
    pub const NAME: &'static str = "pdf-ocr";

    pub fn new(ocr: Arc<OcrEngineSet>, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        Self {
            ocr,
            rasterizer,
            dpi: DEFAULT_DPI,
        }
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub async fn extract(&self, doc: &Document, config: &ExtractionConfig) -> Result<ExtractionOutcome> {
        if config.ocr_engine == OcrEngine::None {
            return Ok(ExtractionOutcome::fallback("OCR is disabled"));
        }

        let pages = self.rasterizer.rasterize(doc.bytes(), self.dpi, config.timeout()).await?;
        tracing::debug!("Rasterized {} PDF pages with {}", pages.len(), self.rasterizer.name());

        let page_count = pages.len();
        let mut segments = Vec::with_capacity(page_count);
        for page in pages {
            let lines = self.ocr.recognize(&page.png, config).await?;
            segments.extend(segment_from_lines(lines, Some(page.page)));
        }

        let raw = RawExtraction::from_segments(segments)
            .with_metadata("page_count", page_count)
            .with_metadata("ocr_engine", config.ocr_engine.as_str())
            .with_metadata("dpi", self.dpi);
        Ok(ExtractionOutcome::Extracted(raw))
    }
}
