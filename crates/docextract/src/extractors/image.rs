//! Image extractor: OCR through the configured engine.

use crate::core::config::{ExtractionConfig, OcrEngine};
use crate::core::execution::run_blocking;
use crate::core::io::Document;
use crate::error::{DocExtractError, Result};
use crate::ocr::OcrEngineSet;
use crate::plugins::{ExtractionOutcome, RecognizedText};
use crate::types::{RawExtraction, TextSegment};
use std::io::Cursor;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ImageOcrExtractor {
    ocr: Arc<OcrEngineSet>,
}

impl ImageOcrExtractor {
    pub const NAME: &'static str = "image-ocr";

    pub fn new(ocr: Arc<OcrEngineSet>) -> Self {
        Self { ocr }
    }

    pub async fn extract(&self, doc: &Document, config: &ExtractionConfig) -> Result<ExtractionOutcome> {
        if config.ocr_engine == OcrEngine::None {
            return Ok(ExtractionOutcome::fallback("OCR is disabled"));
        }

        let bytes = doc.content.clone();
        let (width, height) = run_blocking(move || image_dimensions(&bytes)).await?;

        let lines = self.ocr.recognize(doc.bytes(), config).await?;
        let segment = segment_from_lines(lines, None);

        let raw = RawExtraction::from_segments(segment.into_iter().collect())
            .with_metadata("width", width)
            .with_metadata("height", height)
            .with_metadata("ocr_engine", config.ocr_engine.as_str());
        Ok(ExtractionOutcome::Extracted(raw))
    }
}

pub fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()
        .map_err(|e| DocExtractError::malformed_with_source("Failed to decode image", e))
}

/// One segment for a recognized page: lines joined with `\n`, mean line
/// confidence and the union of line regions. `None` when nothing was read.
pub(crate) fn segment_from_lines(lines: Vec<RecognizedText>, page: Option<usize>) -> Option<TextSegment> {
    if lines.is_empty() {
        return None;
    }
    let confidence = lines.iter().map(|l| l.confidence).sum::<f64>() / lines.len() as f64;
    let region = lines.iter().filter_map(|l| l.region).reduce(|acc, r| acc.union(&r));
    let text = lines.into_iter().map(|l| l.text).collect::<Vec<_>>().join("\n");
    Some(TextSegment {
        text,
        page,
        region,
        confidence: Some(confidence),
    })
}
