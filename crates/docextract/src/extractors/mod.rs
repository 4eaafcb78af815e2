//! Built-in extractors.
//!
//! [`Extractor`] is a closed set of variants sharing one contract: take a
//! loaded [`Document`] and a config, return text segments or ask for a
//! fallback. User extractors plug in through [`Extractor::Custom`].
//!
//! | Variant | Formats | OCR | Priority |
//! |---|---|---|---|
//! | `PdfText` | PDF | no | 100 |
//! | `Docx` | DOCX | no | 50 |
//! | `Pptx` | PPTX | no | 50 |
//! | `Spreadsheet` | XLSX, XLS, ODS | no | 50 |
//! | `PlainText` | text, Markdown, CSV | no | 50 |
//! | `PdfOcr` | PDF | yes | 50 |
//! | `ImageOcr` | all images | yes | 50 |

#[cfg(feature = "office")]
pub mod docx;
#[cfg(feature = "excel")]
pub mod excel;
pub mod image;
#[cfg(feature = "office")]
mod office;
#[cfg(feature = "pdf")]
pub mod pdf;
#[cfg(feature = "office")]
pub mod pptx;
pub mod text;

#[cfg(feature = "office")]
pub use docx::DocxExtractor;
#[cfg(feature = "excel")]
pub use excel::SpreadsheetExtractor;
pub use image::ImageOcrExtractor;
#[cfg(feature = "pdf")]
pub use pdf::{PdfOcrExtractor, PdfTextExtractor};
#[cfg(feature = "office")]
pub use pptx::PptxExtractor;
pub use text::PlainTextExtractor;

use crate::core::config::ExtractionConfig;
use crate::core::formats::{FormatTag, ImageFormat};
use crate::core::io::Document;
use crate::error::Result;
use crate::plugins::{DocumentExtractor, ExtractionOutcome, ExtractorDescriptor};
use std::sync::Arc;

/// Default priority of built-in extractors.
pub const DEFAULT_PRIORITY: i32 = 50;

/// Priority of the native PDF text extractor.
pub const PDF_TEXT_PRIORITY: i32 = 100;

/// An extraction strategy for one or more formats.
#[derive(Clone)]
pub enum Extractor {
    #[cfg(feature = "pdf")]
    PdfText(PdfTextExtractor),
    #[cfg(feature = "pdf")]
    PdfOcr(PdfOcrExtractor),
    #[cfg(feature = "office")]
    Docx(DocxExtractor),
    #[cfg(feature = "office")]
    Pptx(PptxExtractor),
    #[cfg(feature = "excel")]
    Spreadsheet(SpreadsheetExtractor),
    PlainText(PlainTextExtractor),
    ImageOcr(ImageOcrExtractor),
    Custom(Arc<dyn DocumentExtractor>),
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Extractor").field(&self.name()).finish()
    }
}

impl Extractor {
    pub fn custom(extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self::Custom(extractor)
    }

    pub fn name(&self) -> &str {
        match self {
            #[cfg(feature = "pdf")]
            Self::PdfText(_) => PdfTextExtractor::NAME,
            #[cfg(feature = "pdf")]
            Self::PdfOcr(_) => PdfOcrExtractor::NAME,
            #[cfg(feature = "office")]
            Self::Docx(_) => DocxExtractor::NAME,
            #[cfg(feature = "office")]
            Self::Pptx(_) => PptxExtractor::NAME,
            #[cfg(feature = "excel")]
            Self::Spreadsheet(_) => SpreadsheetExtractor::NAME,
            Self::PlainText(_) => PlainTextExtractor::NAME,
            Self::ImageOcr(_) => ImageOcrExtractor::NAME,
            Self::Custom(custom) => custom.name(),
        }
    }

    /// Registration record: name, formats, priority and OCR requirement.
    pub fn descriptor(&self) -> ExtractorDescriptor {
        let (formats, priority, requires_ocr): (Vec<FormatTag>, i32, bool) = match self {
            #[cfg(feature = "pdf")]
            Self::PdfText(_) => (vec![FormatTag::Pdf], PDF_TEXT_PRIORITY, false),
            #[cfg(feature = "pdf")]
            Self::PdfOcr(_) => (vec![FormatTag::Pdf], DEFAULT_PRIORITY, true),
            #[cfg(feature = "office")]
            Self::Docx(_) => (vec![FormatTag::Docx], DEFAULT_PRIORITY, false),
            #[cfg(feature = "office")]
            Self::Pptx(_) => (vec![FormatTag::Pptx], DEFAULT_PRIORITY, false),
            #[cfg(feature = "excel")]
            Self::Spreadsheet(_) => (
                vec![FormatTag::Xlsx, FormatTag::Xls, FormatTag::Ods],
                DEFAULT_PRIORITY,
                false,
            ),
            Self::PlainText(_) => (
                vec![FormatTag::PlainText, FormatTag::Markdown, FormatTag::Csv],
                DEFAULT_PRIORITY,
                false,
            ),
            Self::ImageOcr(_) => (
                ImageFormat::ALL.iter().copied().map(FormatTag::Image).collect(),
                DEFAULT_PRIORITY,
                true,
            ),
            Self::Custom(custom) => (
                custom.supported_formats().to_vec(),
                custom.priority(),
                custom.requires_ocr(),
            ),
        };
        ExtractorDescriptor {
            name: self.name().to_string(),
            formats,
            priority,
            requires_ocr,
        }
    }

    pub async fn extract(&self, doc: &Document, config: &ExtractionConfig) -> Result<ExtractionOutcome> {
        match self {
            #[cfg(feature = "pdf")]
            Self::PdfText(e) => e.extract(doc, config).await,
            #[cfg(feature = "pdf")]
            Self::PdfOcr(e) => e.extract(doc, config).await,
            #[cfg(feature = "office")]
            Self::Docx(e) => e.extract(doc, config).await,
            #[cfg(feature = "office")]
            Self::Pptx(e) => e.extract(doc, config).await,
            #[cfg(feature = "excel")]
            Self::Spreadsheet(e) => e.extract(doc, config).await,
            Self::PlainText(e) => e.extract(doc, config).await,
            Self::ImageOcr(e) => e.extract(doc, config).await,
            Self::Custom(e) => e.extract(doc, config).await,
        }
    }

    /// Built-ins hold no lifecycle state; only custom extractors are notified.
    pub fn initialize(&self) -> Result<()> {
        match self {
            Self::Custom(custom) => custom.initialize(),
            _ => Ok(()),
        }
    }

    pub fn shutdown(&self) -> Result<()> {
        match self {
            Self::Custom(custom) => custom.shutdown(),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrEngineSet;

    #[test]
    fn test_builtin_descriptors() {
        let image = Extractor::ImageOcr(ImageOcrExtractor::new(Arc::new(OcrEngineSet::empty())));
        let descriptor = image.descriptor();
        assert_eq!(descriptor.name, "image-ocr");
        assert!(descriptor.requires_ocr);
        assert_eq!(descriptor.formats.len(), ImageFormat::ALL.len());

        let text = Extractor::PlainText(PlainTextExtractor).descriptor();
        assert!(!text.requires_ocr);
        assert!(text.formats.contains(&FormatTag::Csv));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_pdf_text_outranks_default_priority() {
        let descriptor = Extractor::PdfText(PdfTextExtractor).descriptor();
        assert_eq!(descriptor.priority, PDF_TEXT_PRIORITY);
        assert_eq!(format!("{:?}", Extractor::PdfText(PdfTextExtractor)), "Extractor(\"pdf-text\")");
    }
}
