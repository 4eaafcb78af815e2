//! Post-processing: turns an extractor's raw output into the final result.
//!
//! Runs in order:
//! 1. Normalization of every segment; segments left empty are dropped
//! 2. Metadata merge; the keys below overwrite extractor values of the same name
//! 3. Chunking, when enabled
//!
//! | Key | Value |
//! |---|---|
//! | `format` | canonical format tag |
//! | `mime_type` | MIME type of the tag |
//! | `content_length` | input size in bytes |
//! | `extractor` | name of the extractor that produced the text |
//! | `segment_count` | segments after normalization |
//! | `character_count` | characters of the joined content |
//!
//! Chunking failures are recorded as a [`ProcessingWarning`] with source
//! `"chunking"` and never fail the request.

use crate::chunking::{Chunker, FixedWindowChunker, locate_chunks};
use crate::core::config::ExtractionConfig;
use crate::core::io::Document;
use crate::text::normalize_text;
use crate::types::{ExtractionResult, ProcessingWarning, RawExtraction};
use serde_json::Value;
use std::sync::Arc;

pub const CHUNKING_WARNING_SOURCE: &str = "chunking";

#[derive(Clone)]
pub struct PostProcessor {
    chunker: Arc<dyn Chunker>,
}

impl std::fmt::Debug for PostProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostProcessor")
            .field("chunker", &self.chunker.name())
            .finish()
    }
}

impl Default for PostProcessor {
    fn default() -> Self {
        Self::new(Arc::new(FixedWindowChunker))
    }
}

impl PostProcessor {
    pub fn new(chunker: Arc<dyn Chunker>) -> Self {
        Self { chunker }
    }

    pub fn chunker(&self) -> &dyn Chunker {
        self.chunker.as_ref()
    }

    pub fn process(
        &self,
        raw: RawExtraction,
        doc: &Document,
        config: &ExtractionConfig,
        extractor: &str,
    ) -> ExtractionResult {
        let segments: Vec<_> = raw
            .segments
            .into_iter()
            .filter_map(|mut segment| {
                segment.text = normalize_text(&segment.text);
                (!segment.text.is_empty()).then_some(segment)
            })
            .collect();

        let mut result = ExtractionResult {
            format: doc.format,
            segments,
            metadata: raw.metadata,
            tables: raw.tables,
            chunks: None,
            warnings: Vec::new(),
        };

        let content = result.content();
        let detected = [
            ("format", Value::from(doc.format.as_str())),
            ("mime_type", Value::from(doc.format.mime_type())),
            ("content_length", Value::from(doc.len())),
            ("extractor", Value::from(extractor)),
            ("segment_count", Value::from(result.segments.len())),
            ("character_count", Value::from(content.chars().count())),
        ];
        for (key, value) in detected {
            result.metadata.insert(key.to_string(), value);
        }

        if config.chunking_enabled {
            match self.chunker.chunk(&content, config.chunk_size, config.chunk_overlap) {
                Ok(pieces) => {
                    result.chunks = Some(locate_chunks(&content, pieces, config.chunk_overlap));
                }
                Err(e) => {
                    tracing::warn!("Chunking with {} failed: {}", self.chunker.name(), e);
                    result.warnings.push(ProcessingWarning {
                        source: CHUNKING_WARNING_SOURCE.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        result
    }
}
