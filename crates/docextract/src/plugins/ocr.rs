//! OCR engine adapter trait.

use crate::Result;
use crate::core::config::OcrEngine;
use crate::plugins::Plugin;
use crate::types::BoundingBox;
use async_trait::async_trait;
use std::time::Duration;

/// Per-call settings handed to an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOptions {
    /// Language codes already translated to the engine's dialect.
    pub languages: Vec<String>,
    /// Hard limit for the engine run; the engine process is killed past it.
    pub timeout: Duration,
}

/// One recognized line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    /// Confidence in `0.0..=1.0`.
    pub confidence: f64,
    pub region: Option<BoundingBox>,
}

/// Uniform interface over OCR engines.
///
/// Adapters translate engine-specific failures (non-zero exit, unparseable
/// output, missing binary) into `DocExtractError::OcrEngine` and never retry;
/// retry policy belongs to the orchestrator. Results are in reading order.
#[async_trait]
pub trait OcrBackend: Plugin {
    async fn recognize(&self, image: &[u8], options: &OcrOptions) -> Result<Vec<RecognizedText>>;

    fn engine(&self) -> OcrEngine;

    /// Language codes in the engine's own dialect.
    fn supported_languages(&self) -> Vec<String> {
        vec![]
    }

    fn supports_language(&self, lang: &str) -> bool {
        self.supported_languages().iter().any(|l| l == lang)
    }

    /// Whether concurrent `recognize` calls on one instance are safe. When
    /// false, calls through an `OcrEngineSet` are serialized.
    fn is_concurrent_safe(&self) -> bool {
        true
    }
}
