use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::formats::FormatTag;

/// Final result returned by every extraction entry point.
///
/// Results are shared between the cache and concurrent callers behind an `Arc`
/// and never mutated after the post-processor hands them over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub format: FormatTag,
    pub segments: Vec<TextSegment>,
    pub metadata: HashMap<String, serde_json::Value>,

    /// Tables, when `extract_tables` is set and the extractor supports them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<Table>>,

    /// Text chunks when chunking is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<Chunk>>,

    /// Non-fatal problems hit while post-processing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ProcessingWarning>,
}

impl ExtractionResult {
    /// Full text with segments separated by a blank line.
    pub fn content(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Rough heap footprint, used by byte-bounded caches.
    pub fn approximate_size(&self) -> usize {
        let segments: usize = self.segments.iter().map(|s| s.text.len() + 48).sum();
        let metadata: usize = self
            .metadata
            .iter()
            .map(|(k, v)| k.len() + v.to_string().len())
            .sum();
        let tables: usize = self
            .tables
            .iter()
            .flatten()
            .map(|t| t.markdown.len() + t.cells.iter().flatten().map(String::len).sum::<usize>())
            .sum();
        let chunks: usize = self.chunks.iter().flatten().map(|c| c.content.len() + 40).sum();
        std::mem::size_of::<Self>() + segments + metadata + tables + chunks
    }
}

/// A run of text with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    pub text: String,
    /// 1-indexed page, slide or sheet number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<BoundingBox>,
    /// OCR confidence in `0.0..=1.0`; `None` for native text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl TextSegment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page: None,
            region: None,
            confidence: None,
        }
    }

    pub fn on_page(text: impl Into<String>, page: usize) -> Self {
        Self {
            page: Some(page),
            ..Self::new(text)
        }
    }
}

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn right(&self) -> u32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        BoundingBox {
            left,
            top,
            width: self.right().max(other.right()) - left,
            height: self.bottom().max(other.bottom()) - top,
        }
    }
}

/// Extracted table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table cells as a 2D vector (rows × columns)
    pub cells: Vec<Vec<String>>,
    /// Markdown representation of the table
    pub markdown: String,
    /// Page, slide or sheet number where the table was found (1-indexed)
    pub page_number: usize,
}

impl Table {
    pub fn from_cells(cells: Vec<Vec<String>>, page_number: usize) -> Self {
        let markdown = cells_to_markdown(&cells);
        Self {
            cells,
            markdown,
            page_number,
        }
    }
}

fn cells_to_markdown(cells: &[Vec<String>]) -> String {
    let Some(header) = cells.first() else {
        return String::new();
    };
    let width = cells.iter().map(Vec::len).max().unwrap_or(0);
    let row = |r: &[String]| {
        let mut line = String::from("|");
        for i in 0..width {
            line.push(' ');
            line.push_str(&r.get(i).map(|c| c.replace('|', "\\|")).unwrap_or_default());
            line.push_str(" |");
        }
        line
    };

    let mut out = vec![row(header)];
    out.push(format!("|{}", " --- |".repeat(width)));
    out.extend(cells.iter().skip(1).map(|r| row(r)));
    out.join("\n")
}

/// A text chunk and its position in the document content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Metadata about a chunk's position in the original document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Byte offset where this chunk starts in the content.
    pub byte_start: usize,
    /// Byte offset where this chunk ends in the content.
    pub byte_end: usize,
    /// Zero-based index of this chunk in the document.
    pub chunk_index: usize,
    /// Total number of chunks in the document.
    pub total_chunks: usize,
}

/// Non-fatal issue recorded on a result instead of failing the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingWarning {
    /// Component that produced the warning, e.g. `"chunking"`.
    pub source: String,
    pub message: String,
}

/// What an extractor produces before post-processing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawExtraction {
    pub segments: Vec<TextSegment>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub tables: Option<Vec<Table>>,
}

impl RawExtraction {
    pub fn from_segments(segments: Vec<TextSegment>) -> Self {
        Self {
            segments,
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}
