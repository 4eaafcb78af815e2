//! Plain text, Markdown and CSV.

use crate::core::config::ExtractionConfig;
use crate::core::io::Document;
use crate::error::Result;
use crate::plugins::ExtractionOutcome;
use crate::text::safe_decode;
use crate::types::{RawExtraction, TextSegment};

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub const NAME: &'static str = "plain-text";

    /// Decoding never fails; an empty file yields an empty result.
    pub async fn extract(&self, doc: &Document, _config: &ExtractionConfig) -> Result<ExtractionOutcome> {
        let text = safe_decode(doc.bytes());
        let line_count = text.lines().count();
        let segments = if text.is_empty() {
            Vec::new()
        } else {
            vec![TextSegment::new(text)]
        };
        Ok(ExtractionOutcome::Extracted(
            RawExtraction::from_segments(segments).with_metadata("line_count", line_count),
        ))
    }
}
