//! Fixtures and stub backends shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use docextract::cache::{CacheBackend, CacheKey};
use docextract::pdf::{PageRasterizer, RasterizedPage};
use docextract::plugins::{DocumentExtractor, ExtractionOutcome, OcrBackend, OcrOptions, Plugin, RecognizedText};
use docextract::{
    BoundingBox, DocExtractError, Document, ExtractionResult, FormatTag, OcrEngine, OcrEngineSet, Orchestrator,
    OrchestratorConfig, RawExtraction, Result, TextSegment,
};
use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};
use parking_lot::Mutex;
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const OCR_TEXT: &str = "Recognized by stub";

/// A PDF with one page per entry, each drawing its text in Courier.
pub fn text_pdf(pages: &[&str]) -> Vec<u8> {
    build_pdf(pages.iter().map(|t| Some(*t)).collect())
}

/// A PDF whose pages have no text layer, like a scan.
pub fn scanned_pdf(page_count: usize) -> Vec<u8> {
    build_pdf(vec![None; page_count])
}

fn build_pdf(pages: Vec<Option<&str>>) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for text in pages {
        let operations = match text {
            Some(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
            None => vec![],
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Quarterly Report"),
        "Author" => Object::string_literal("Finance Team"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A minimal Word document with one paragraph per entry.
pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let core = r#"<?xml version="1.0" encoding="UTF-8"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Memo</dc:title><dc:creator>Ada</dc:creator></cp:coreProperties>"#;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(b"<Types/>").unwrap();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(document.as_bytes()).unwrap();
    zip.start_file("docProps/core.xml", options).unwrap();
    zip.write_all(core.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

/// A white PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// OCR backend answering every image with [`OCR_TEXT`].
pub struct StubOcr {
    calls: AtomicUsize,
    version: Mutex<String>,
    delay: Duration,
}

impl StubOcr {
    pub fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            version: Mutex::new("stub 1.0".to_string()),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_version(&self, version: &str) {
        *self.version.lock() = version.to_string();
    }
}

impl Plugin for StubOcr {
    fn name(&self) -> &str {
        "stub-ocr"
    }

    fn version(&self) -> String {
        self.version.lock().clone()
    }
}

#[async_trait]
impl OcrBackend for StubOcr {
    async fn recognize(&self, _image: &[u8], _options: &OcrOptions) -> Result<Vec<RecognizedText>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(vec![RecognizedText {
            text: OCR_TEXT.to_string(),
            confidence: 0.9,
            region: Some(BoundingBox {
                left: 10,
                top: 10,
                width: 200,
                height: 20,
            }),
        }])
    }

    fn engine(&self) -> OcrEngine {
        OcrEngine::Tesseract
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["eng".to_string(), "deu".to_string()]
    }
}

/// Rasterizer that returns one blank PNG per requested page.
pub struct StubRasterizer {
    pages: usize,
    calls: AtomicUsize,
}

impl StubRasterizer {
    pub fn new(pages: usize) -> Arc<Self> {
        Arc::new(Self {
            pages,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRasterizer for StubRasterizer {
    fn name(&self) -> &str {
        "stub-rasterizer"
    }

    async fn rasterize(&self, _pdf: &[u8], _dpi: u32, _timeout: Duration) -> Result<Vec<RasterizedPage>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((1..=self.pages)
            .map(|page| RasterizedPage { page, png: png(16, 16) })
            .collect())
    }
}

/// Plain-text extractor that counts calls, outranking the built-in one.
pub struct CountingExtractor {
    calls: AtomicUsize,
    delay: Duration,
}

impl CountingExtractor {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Plugin for CountingExtractor {
    fn name(&self) -> &str {
        "counting"
    }

    fn version(&self) -> String {
        "1.0.0".to_string()
    }
}

#[async_trait]
impl DocumentExtractor for CountingExtractor {
    async fn extract(&self, doc: &Document, _config: &docextract::ExtractionConfig) -> Result<ExtractionOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let text = String::from_utf8_lossy(doc.bytes()).into_owned();
        Ok(ExtractionOutcome::Extracted(RawExtraction::from_segments(vec![
            TextSegment::new(text),
        ])))
    }

    fn supported_formats(&self) -> &[FormatTag] {
        &[FormatTag::PlainText]
    }

    fn priority(&self) -> i32 {
        100
    }
}

/// Cache backend whose every operation fails.
#[derive(Default)]
pub struct FailingCache {
    pub attempts: AtomicUsize,
}

impl FailingCache {
    fn fail<T>(&self) -> Result<T> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DocExtractError::cache("backend offline"))
    }
}

impl CacheBackend for FailingCache {
    fn name(&self) -> &str {
        "failing"
    }

    fn get(&self, _key: &CacheKey) -> Result<Option<Arc<ExtractionResult>>> {
        self.fail()
    }

    fn put(&self, _key: &CacheKey, _value: Arc<ExtractionResult>) -> Result<()> {
        self.fail()
    }

    fn invalidate(&self, _key: &CacheKey) -> Result<bool> {
        self.fail()
    }

    fn clear(&self) -> Result<()> {
        self.fail()
    }

    fn len(&self) -> usize {
        0
    }
}

/// Fast retries so transient-failure tests do not sleep for long.
pub fn quick_config() -> OrchestratorConfig {
    let mut config = OrchestratorConfig::default();
    config.retry.initial_backoff_ms = 1;
    config.retry.max_backoff_ms = 5;
    config
}

/// Orchestrator with the built-in extractors wired to stub OCR and rendering.
pub fn stub_orchestrator(ocr: Arc<StubOcr>, rasterizer: Arc<StubRasterizer>) -> Orchestrator {
    stub_orchestrator_with(ocr, rasterizer, quick_config())
}

pub fn stub_orchestrator_with(
    ocr: Arc<StubOcr>,
    rasterizer: Arc<StubRasterizer>,
    config: OrchestratorConfig,
) -> Orchestrator {
    Orchestrator::builder()
        .config(config)
        .ocr_engines(OcrEngineSet::empty().with_backend(ocr))
        .rasterizer(rasterizer)
        .build()
        .unwrap()
}
