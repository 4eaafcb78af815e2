//! Format detection.
//!
//! Signatures are checked first (magic numbers, container structure), then the
//! declared name's extension, then a plain-text sniff. Detection never fails:
//! anything inconclusive is [`FormatTag::Unknown`] and the orchestrator decides
//! what that means.

use crate::core::formats::{FormatTag, ImageFormat, ODS_MIME_TYPE};
use crate::core::io::Document;
use std::path::Path;

const PDF_SIGNATURE: &[u8] = b"%PDF-";
/// Padding before the header (whitespace, NULs, a BOM) is tolerated within 1 KiB.
const PDF_SIGNATURE_WINDOW: usize = 1024;
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const OLE_SIGNATURE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";
const TEXT_SNIFF_LEN: usize = 8 * 1024;

/// Detect the format of `bytes`, using `name` only when signatures are inconclusive.
pub fn detect(bytes: &[u8], name: Option<&str>) -> FormatTag {
    if let Some(tag) = detect_signature(bytes) {
        return tag;
    }

    let from_name = name.and_then(extension_of).and_then(|ext| FormatTag::from_extension(&ext));
    if let Some(tag) = from_name {
        return tag;
    }

    if looks_like_text(bytes) {
        return FormatTag::PlainText;
    }

    FormatTag::Unknown
}

/// Re-run detection on an already loaded document.
pub fn detect_document(doc: &Document) -> FormatTag {
    detect(doc.bytes(), doc.name.as_deref())
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn detect_signature(bytes: &[u8]) -> Option<FormatTag> {
    if has_pdf_header(bytes) {
        return Some(FormatTag::Pdf);
    }

    if bytes.starts_with(ZIP_SIGNATURE) {
        return detect_zip_container(bytes);
    }

    if bytes.starts_with(OLE_SIGNATURE) {
        // Word and PowerPoint binaries share this header; only xls is supported.
        return infer::doc::is_xls(bytes).then_some(FormatTag::Xls);
    }

    let kind = infer::get(bytes)?;
    let image = match kind.mime_type() {
        "image/png" => ImageFormat::Png,
        "image/jpeg" => ImageFormat::Jpeg,
        "image/tiff" => ImageFormat::Tiff,
        "image/bmp" => ImageFormat::Bmp,
        "image/gif" => ImageFormat::Gif,
        "image/webp" => ImageFormat::Webp,
        _ => return None,
    };
    Some(FormatTag::Image(image))
}

/// `%PDF-` at the start, after only padding. A mention further into the text does not count.
fn has_pdf_header(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let window = &bytes[..bytes.len().min(PDF_SIGNATURE_WINDOW)];
    window
        .iter()
        .position(|b| !b.is_ascii_whitespace() && *b != 0)
        .is_some_and(|start| window[start..].starts_with(PDF_SIGNATURE))
}

#[cfg(feature = "office")]
fn detect_zip_container(bytes: &[u8]) -> Option<FormatTag> {
    use std::io::{Cursor, Read};

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).ok()?;

    if let Ok(mut entry) = archive.by_name("mimetype") {
        let mut mimetype = String::new();
        if entry.read_to_string(&mut mimetype).is_ok() && mimetype.trim() == ODS_MIME_TYPE {
            return Some(FormatTag::Ods);
        }
    }

    let names: Vec<&str> = archive.file_names().collect();
    if names.contains(&"word/document.xml") {
        Some(FormatTag::Docx)
    } else if names.contains(&"ppt/presentation.xml") {
        Some(FormatTag::Pptx)
    } else if names.contains(&"xl/workbook.xml") {
        Some(FormatTag::Xlsx)
    } else {
        None
    }
}

/// Without a zip reader we still recognise containers from the uncompressed
/// entry names in the local file headers.
#[cfg(not(feature = "office"))]
fn detect_zip_container(bytes: &[u8]) -> Option<FormatTag> {
    let contains = |needle: &[u8]| bytes.windows(needle.len()).any(|w| w == needle);
    if contains(ODS_MIME_TYPE.as_bytes()) {
        Some(FormatTag::Ods)
    } else if contains(b"word/document.xml") {
        Some(FormatTag::Docx)
    } else if contains(b"ppt/presentation.xml") {
        Some(FormatTag::Pptx)
    } else if contains(b"xl/workbook.xml") {
        Some(FormatTag::Xlsx)
    } else {
        None
    }
}

fn looks_like_text(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let sample = &bytes[..bytes.len().min(TEXT_SNIFF_LEN)];
    if sample.contains(&0) {
        return false;
    }
    match std::str::from_utf8(sample) {
        Ok(_) => true,
        // A multi-byte sequence cut by the sample boundary is still UTF-8.
        Err(e) if e.error_len().is_none() => true,
        Err(_) => {
            let control = sample
                .iter()
                .filter(|b| b.is_ascii_control() && !matches!(b, b'\n' | b'\r' | b'\t' | 0x0C))
                .count();
            control * 20 < sample.len()
        }
    }
}
