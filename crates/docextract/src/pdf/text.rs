//! Native text layer extraction with `lopdf`.

use crate::error::{DocExtractError, Result};
use lopdf::{Document, Object};
use serde_json::Value;
use std::collections::HashMap;

/// Minimum number of alphanumeric characters for a word to count as meaningful.
const MIN_MEANINGFUL_WORD_LEN: usize = 4;
/// Below this share of alphanumeric characters a layer without words is noise.
const MIN_ALNUM_RATIO: f64 = 0.3;
/// Pages averaging fewer non-whitespace characters than this carry no body text.
const MIN_NON_WHITESPACE_PER_PAGE: f64 = 32.0;

const INFO_FIELDS: &[(&[u8], &str)] = &[
    (b"Title", "title"),
    (b"Author", "author"),
    (b"Subject", "subject"),
    (b"Keywords", "keywords"),
    (b"Creator", "creator"),
    (b"Producer", "producer"),
];

/// Text layer and document info of a PDF.
#[derive(Debug, Clone, Default)]
pub struct PdfText {
    /// (1-indexed page number, text) in page order.
    pub pages: Vec<(usize, String)>,
    pub metadata: HashMap<String, Value>,
}

impl PdfText {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Parse `bytes` and pull the text of every page.
///
/// A page whose content stream cannot be decoded yields empty text rather
/// than failing the document; an unparseable file is `Malformed`.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<PdfText> {
    let document = Document::load_mem(bytes)?;
    if document.is_encrypted() {
        return Err(DocExtractError::malformed("PDF is encrypted"));
    }

    let pages = document
        .get_pages()
        .keys()
        .map(|&number| {
            let text = document.extract_text(&[number]).unwrap_or_else(|e| {
                tracing::debug!("No text for PDF page {}: {}", number, e);
                String::new()
            });
            (number as usize, text)
        })
        .collect::<Vec<_>>();

    let mut metadata = read_info(&document);
    metadata.insert("page_count".to_string(), Value::from(pages.len()));
    metadata.insert("pdf_version".to_string(), Value::from(document.version.clone()));

    Ok(PdfText { pages, metadata })
}

/// Number of pages without extracting text.
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    Ok(Document::load_mem(bytes)?.get_pages().len())
}

fn read_info(document: &Document) -> HashMap<String, Value> {
    let mut metadata = HashMap::new();
    let info = document
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .and_then(|id| document.get_dictionary(id));
    let Ok(info) = info else {
        return metadata;
    };

    for (key, name) in INFO_FIELDS {
        if let Ok(Object::String(raw, _)) = info.get(key) {
            let value = decode_text_string(raw);
            if !value.trim().is_empty() {
                metadata.insert(name.to_string(), Value::from(value.trim()));
            }
        }
    }
    metadata
}

/// PDF text strings are UTF-16BE with a BOM or PDFDocEncoding (Latin-1 superset).
fn decode_text_string(raw: &[u8]) -> String {
    if let Some(utf16) = raw.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(raw) {
        Ok(text) => text.to_string(),
        Err(_) => raw.iter().map(|&b| b as char).collect(),
    }
}

/// Why a native text layer is unusable, or `None` when it can be used.
///
/// Scanned documents typically have no text at all, only page numbers, or
/// glyph soup from a broken font mapping.
pub fn unusable_layer_reason(pdf: &PdfText) -> Option<String> {
    let mut non_whitespace = 0usize;
    let mut alnum = 0usize;
    let mut meaningful_words = 0usize;

    for (_, text) in &pdf.pages {
        for ch in text.chars().filter(|c| !c.is_whitespace()) {
            non_whitespace += 1;
            if ch.is_alphanumeric() {
                alnum += 1;
            }
        }
        meaningful_words += text
            .split_whitespace()
            .filter(|word| word.chars().filter(|c| c.is_alphanumeric()).count() >= MIN_MEANINGFUL_WORD_LEN)
            .count();
    }

    if non_whitespace == 0 {
        return Some("PDF has no text layer".to_string());
    }
    if alnum == 0 {
        return Some("PDF text layer has no alphanumeric characters".to_string());
    }

    let alnum_ratio = alnum as f64 / non_whitespace as f64;
    let avg_per_page = non_whitespace as f64 / pdf.page_count().max(1) as f64;
    if meaningful_words == 0 && (alnum_ratio < MIN_ALNUM_RATIO || avg_per_page < MIN_NON_WHITESPACE_PER_PAGE) {
        return Some(format!(
            "PDF text layer looks unusable ({non_whitespace} characters over {} pages, no words)",
            pdf.page_count()
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_text(pages: &[&str]) -> PdfText {
        PdfText {
            pages: pages.iter().enumerate().map(|(i, t)| (i + 1, t.to_string())).collect(),
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_empty_layer_is_unusable() {
        assert!(unusable_layer_reason(&pdf_text(&["", "  \n"])).is_some());
    }

    #[test]
    fn test_page_numbers_only_is_unusable() {
        assert!(unusable_layer_reason(&pdf_text(&["1", "2", "3"])).is_some());
    }

    #[test]
    fn test_symbol_soup_is_unusable() {
        assert!(unusable_layer_reason(&pdf_text(&["@@ ## !! %% ^^ && ** (( )) a"])).is_some());
    }

    #[test]
    fn test_short_real_text_is_usable() {
        assert!(unusable_layer_reason(&pdf_text(&["Hello World"])).is_none());
    }

    #[test]
    fn test_decode_text_string() {
        assert_eq!(decode_text_string(b"Plain"), "Plain");
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, b'H', 0x00, b'i']), "Hi");
        assert_eq!(decode_text_string(&[b'c', b'a', b'f', 0xE9]), "café");
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = extract_pdf_text(b"%PDF-1.4 this is not really a pdf").unwrap_err();
        assert!(matches!(err, DocExtractError::Extraction { .. }));
    }
}
