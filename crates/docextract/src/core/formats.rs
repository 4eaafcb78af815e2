//! Logical document types used to route a document to its extractors.

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::{DocExtractError, Result};

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const DOCX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PPTX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const XLSX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS_MIME_TYPE: &str = "application/vnd.ms-excel";
pub const ODS_MIME_TYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";
pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";
pub const MARKDOWN_MIME_TYPE: &str = "text/markdown";
pub const CSV_MIME_TYPE: &str = "text/csv";
pub const OCTET_STREAM_MIME_TYPE: &str = "application/octet-stream";

/// Raster image encodings we can hand to an OCR engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Tiff,
    Bmp,
    Gif,
    Webp,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 6] = [
        ImageFormat::Png,
        ImageFormat::Jpeg,
        ImageFormat::Tiff,
        ImageFormat::Bmp,
        ImageFormat::Gif,
        ImageFormat::Webp,
    ];

    pub fn subtype(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }
}

/// Exactly one tag per detection; `Unknown` when nothing matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormatTag {
    Pdf,
    Docx,
    Pptx,
    Xlsx,
    Xls,
    Ods,
    Image(ImageFormat),
    PlainText,
    Markdown,
    Csv,
    Unknown,
}

impl FormatTag {
    /// Canonical name, stable across releases since it feeds cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatTag::Pdf => "pdf",
            FormatTag::Docx => "docx",
            FormatTag::Pptx => "pptx",
            FormatTag::Xlsx => "xlsx",
            FormatTag::Xls => "xls",
            FormatTag::Ods => "ods",
            FormatTag::Image(ImageFormat::Png) => "image/png",
            FormatTag::Image(ImageFormat::Jpeg) => "image/jpeg",
            FormatTag::Image(ImageFormat::Tiff) => "image/tiff",
            FormatTag::Image(ImageFormat::Bmp) => "image/bmp",
            FormatTag::Image(ImageFormat::Gif) => "image/gif",
            FormatTag::Image(ImageFormat::Webp) => "image/webp",
            FormatTag::PlainText => "plain-text",
            FormatTag::Markdown => "markdown",
            FormatTag::Csv => "csv",
            FormatTag::Unknown => "unknown",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            FormatTag::Pdf => PDF_MIME_TYPE,
            FormatTag::Docx => DOCX_MIME_TYPE,
            FormatTag::Pptx => PPTX_MIME_TYPE,
            FormatTag::Xlsx => XLSX_MIME_TYPE,
            FormatTag::Xls => XLS_MIME_TYPE,
            FormatTag::Ods => ODS_MIME_TYPE,
            // Canonical image names double as their MIME types.
            FormatTag::Image(_) => self.as_str(),
            FormatTag::PlainText => PLAIN_TEXT_MIME_TYPE,
            FormatTag::Markdown => MARKDOWN_MIME_TYPE,
            FormatTag::Csv => CSV_MIME_TYPE,
            FormatTag::Unknown => OCTET_STREAM_MIME_TYPE,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, FormatTag::Image(_))
    }

    pub fn is_spreadsheet(&self) -> bool {
        matches!(self, FormatTag::Xlsx | FormatTag::Xls | FormatTag::Ods)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, FormatTag::PlainText | FormatTag::Markdown | FormatTag::Csv)
    }

    /// Every tag except `Unknown`.
    pub fn all_known() -> Vec<FormatTag> {
        let mut tags = vec![
            FormatTag::Pdf,
            FormatTag::Docx,
            FormatTag::Pptx,
            FormatTag::Xlsx,
            FormatTag::Xls,
            FormatTag::Ods,
        ];
        tags.extend(ImageFormat::ALL.iter().map(|f| FormatTag::Image(*f)));
        tags.extend([FormatTag::PlainText, FormatTag::Markdown, FormatTag::Csv]);
        tags
    }

    /// Tag for a bare file extension, case-insensitive.
    pub fn from_extension(ext: &str) -> Option<FormatTag> {
        EXT_TO_FORMAT.get(ext.to_ascii_lowercase().as_str()).copied()
    }
}

static EXT_TO_FORMAT: Lazy<HashMap<&'static str, FormatTag>> = Lazy::new(|| {
    let mut m = HashMap::new();

    m.insert("pdf", FormatTag::Pdf);

    m.insert("docx", FormatTag::Docx);
    m.insert("pptx", FormatTag::Pptx);
    m.insert("xlsx", FormatTag::Xlsx);
    m.insert("xlsm", FormatTag::Xlsx);
    m.insert("xls", FormatTag::Xls);
    m.insert("ods", FormatTag::Ods);

    m.insert("png", FormatTag::Image(ImageFormat::Png));
    m.insert("jpg", FormatTag::Image(ImageFormat::Jpeg));
    m.insert("jpeg", FormatTag::Image(ImageFormat::Jpeg));
    m.insert("tif", FormatTag::Image(ImageFormat::Tiff));
    m.insert("tiff", FormatTag::Image(ImageFormat::Tiff));
    m.insert("bmp", FormatTag::Image(ImageFormat::Bmp));
    m.insert("gif", FormatTag::Image(ImageFormat::Gif));
    m.insert("webp", FormatTag::Image(ImageFormat::Webp));

    m.insert("txt", FormatTag::PlainText);
    m.insert("text", FormatTag::PlainText);
    m.insert("log", FormatTag::PlainText);
    m.insert("md", FormatTag::Markdown);
    m.insert("markdown", FormatTag::Markdown);
    m.insert("csv", FormatTag::Csv);

    m
});

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatTag {
    type Err = DocExtractError;

    fn from_str(s: &str) -> Result<Self> {
        if s == FormatTag::Unknown.as_str() {
            return Ok(FormatTag::Unknown);
        }
        FormatTag::all_known()
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| DocExtractError::validation(format!("Unknown format tag '{s}'")))
    }
}

impl Serialize for FormatTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FormatTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
