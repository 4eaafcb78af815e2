//! Custom document extractor trait.

use crate::Result;
use crate::core::config::ExtractionConfig;
use crate::core::formats::FormatTag;
use crate::core::io::Document;
use crate::plugins::Plugin;
use crate::types::RawExtraction;
use async_trait::async_trait;

/// What a single extractor attempt produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Extracted(RawExtraction),
    /// The extractor cannot serve this document (e.g. a scanned PDF without a
    /// text layer); the orchestrator moves on to the next candidate.
    NeedsFallback { reason: String },
}

impl ExtractionOutcome {
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self::NeedsFallback { reason: reason.into() }
    }
}

/// Trait for user-supplied extractors.
///
/// Extractors are stateless with respect to documents: the orchestrator owns
/// caching and retry. Return [`ExtractionOutcome::NeedsFallback`] when the
/// document is valid but this extractor has nothing to offer, and an error
/// when the document itself is broken.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use docextract::plugins::{DocumentExtractor, ExtractionOutcome, Plugin};
/// use docextract::{Document, ExtractionConfig, FormatTag, RawExtraction, Result, TextSegment};
///
/// struct ShoutingExtractor;
///
/// impl Plugin for ShoutingExtractor {
///     fn name(&self) -> &str { "shouting" }
///     fn version(&self) -> String { "1.0.0".to_string() }
/// }
///
/// #[async_trait]
/// impl DocumentExtractor for ShoutingExtractor {
///     async fn extract(&self, doc: &Document, _config: &ExtractionConfig) -> Result<ExtractionOutcome> {
///         let text = String::from_utf8_lossy(doc.bytes()).to_uppercase();
///         Ok(ExtractionOutcome::Extracted(RawExtraction::from_segments(vec![TextSegment::new(text)])))
///     }
///
///     fn supported_formats(&self) -> &[FormatTag] {
///         &[FormatTag::PlainText]
///     }
///
///     fn priority(&self) -> i32 { 100 }
/// }
/// ```
#[async_trait]
pub trait DocumentExtractor: Plugin {
    async fn extract(&self, doc: &Document, config: &ExtractionConfig) -> Result<ExtractionOutcome>;

    fn supported_formats(&self) -> &[FormatTag];

    /// Preference among extractors of the same kind; higher runs first.
    fn priority(&self) -> i32 {
        50
    }

    /// Whether this extractor runs OCR. OCR extractors are always ordered
    /// after native ones and are the only candidates under `force_ocr`.
    fn requires_ocr(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TextSegment;
    use std::sync::Arc;

    struct EchoExtractor;

    impl Plugin for EchoExtractor {
        fn name(&self) -> &str {
            "echo"
        }

        fn version(&self) -> String {
            "0.1.0".to_string()
        }
    }

    #[async_trait]
    impl DocumentExtractor for EchoExtractor {
        async fn extract(&self, doc: &Document, _config: &ExtractionConfig) -> Result<ExtractionOutcome> {
            if doc.is_empty() {
                return Ok(ExtractionOutcome::fallback("nothing to echo"));
            }
            let text = String::from_utf8_lossy(doc.bytes()).into_owned();
            Ok(ExtractionOutcome::Extracted(RawExtraction::from_segments(vec![
                TextSegment::new(text),
            ])))
        }

        fn supported_formats(&self) -> &[FormatTag] {
            &[FormatTag::PlainText]
        }
    }

    #[tokio::test]
    async fn test_custom_extractor_outcomes() {
        let extractor = EchoExtractor;
        let config = ExtractionConfig::default();

        let doc = Document::new(Arc::from(&b"hi"[..]), None, FormatTag::PlainText);
        let outcome = extractor.extract(&doc, &config).await.unwrap();
        assert!(matches!(outcome, ExtractionOutcome::Extracted(raw) if raw.segments[0].text == "hi"));

        let empty = Document::new(Arc::from(&b""[..]), None, FormatTag::PlainText);
        let outcome = extractor.extract(&empty, &config).await.unwrap();
        assert_eq!(outcome, ExtractionOutcome::fallback("nothing to echo"));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(EchoExtractor.priority(), 50);
        assert!(!EchoExtractor.requires_ocr());
    }
}
