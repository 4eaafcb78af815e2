//! End-to-end extraction through the orchestrator with stub OCR.
//!
//! Validates that:
//! - Native extractors win over OCR when they produce text
//! - Scanned PDFs fall back to rasterization and OCR
//! - `force_ocr` and a disabled OCR engine steer candidate selection
//! - Post-processing metadata and chunk positions are consistent

#![cfg(all(feature = "pdf", feature = "office"))]

use docextract::{DocExtractError, DocumentHandle, ExtractionConfig, FormatTag, OcrEngine};
use std::io::Write;

mod helpers;

use helpers::{OCR_TEXT, StubOcr, StubRasterizer, docx, png, scanned_pdf, stub_orchestrator, text_pdf};

#[tokio::test]
async fn test_text_pdf_uses_native_layer() {
    let ocr = StubOcr::new();
    let rasterizer = StubRasterizer::new(1);
    let orchestrator = stub_orchestrator(ocr.clone(), rasterizer.clone());

    let result = orchestrator
        .extract(text_pdf(&["Hello World", "Second page"]), &ExtractionConfig::default())
        .await
        .unwrap();

    assert_eq!(result.format, FormatTag::Pdf);
    assert!(result.content().contains("Hello World"));
    assert_eq!(result.segments.len(), 2);
    assert_eq!(result.segments[1].page, Some(2));
    assert_eq!(result.metadata["extractor"], "pdf-text");
    assert_eq!(result.metadata["mime_type"], "application/pdf");
    assert_eq!(result.metadata["title"], "Quarterly Report");
    assert_eq!(result.metadata["page_count"], 2);
    assert_eq!(ocr.calls(), 0);
    assert_eq!(rasterizer.calls(), 0);
}

#[tokio::test]
async fn test_scanned_pdf_falls_back_to_ocr() {
    let ocr = StubOcr::new();
    let rasterizer = StubRasterizer::new(2);
    let orchestrator = stub_orchestrator(ocr.clone(), rasterizer.clone());

    let result = orchestrator
        .extract(scanned_pdf(2), &ExtractionConfig::default())
        .await
        .unwrap();

    assert_eq!(result.metadata["extractor"], "pdf-ocr");
    assert_eq!(result.segments.len(), 2);
    assert!(result.segments.iter().all(|s| s.text == OCR_TEXT));
    assert!(result.segments.iter().all(|s| s.confidence.is_some()));
    assert_eq!(rasterizer.calls(), 1);
    assert_eq!(ocr.calls(), 2);
}

#[tokio::test]
async fn test_force_ocr_skips_native_extractor() {
    let ocr = StubOcr::new();
    let orchestrator = stub_orchestrator(ocr.clone(), StubRasterizer::new(1));
    let config = ExtractionConfig {
        force_ocr: true,
        ..Default::default()
    };

    let result = orchestrator.extract(text_pdf(&["Hello World"]), &config).await.unwrap();
    assert_eq!(result.metadata["extractor"], "pdf-ocr");
    assert_eq!(result.content(), OCR_TEXT);
}

#[tokio::test]
async fn test_scanned_pdf_without_ocr_is_unsupported() {
    let orchestrator = stub_orchestrator(StubOcr::new(), StubRasterizer::new(1));
    let config = ExtractionConfig {
        ocr_engine: OcrEngine::None,
        ..Default::default()
    };

    let err = orchestrator.extract(scanned_pdf(1), &config).await.unwrap_err();
    match err {
        DocExtractError::UnsupportedFormat(message) => {
            assert!(message.contains("pdf-text"), "{message}");
            assert!(message.contains("OCR is disabled"), "{message}");
        }
        other => panic!("expected UnsupportedFormat, got {other:?}"),
    }
}

#[tokio::test]
async fn test_corrupt_pdf_fails_without_fallback() {
    let ocr = StubOcr::new();
    let orchestrator = stub_orchestrator(ocr.clone(), StubRasterizer::new(1));

    let err = orchestrator
        .extract(b"%PDF-1.4\nthis is not a pdf".to_vec(), &ExtractionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocExtractError::Extraction { .. }), "{err:?}");
    assert_eq!(ocr.calls(), 0);
}

#[tokio::test]
async fn test_docx_extraction() {
    let orchestrator = stub_orchestrator(StubOcr::new(), StubRasterizer::new(1));

    let result = orchestrator
        .extract(docx(&["First paragraph", "Second paragraph"]), &ExtractionConfig::default())
        .await
        .unwrap();

    assert_eq!(result.format, FormatTag::Docx);
    assert_eq!(result.metadata["extractor"], "docx");
    assert_eq!(result.metadata["title"], "Memo");
    assert_eq!(result.metadata["author"], "Ada");
    assert!(result.content().contains("First paragraph\nSecond paragraph"));
}

#[tokio::test]
async fn test_image_goes_through_ocr() {
    let ocr = StubOcr::new();
    let orchestrator = stub_orchestrator(ocr.clone(), StubRasterizer::new(1));

    let result = orchestrator.extract(png(40, 30), &ExtractionConfig::default()).await.unwrap();

    assert!(result.format.is_image());
    assert_eq!(result.metadata["extractor"], "image-ocr");
    assert_eq!(result.metadata["width"], 40);
    assert_eq!(result.metadata["height"], 30);
    assert_eq!(result.content(), OCR_TEXT);
    assert_eq!(ocr.calls(), 1);
}

#[tokio::test]
async fn test_plain_text_from_path() {
    let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
    file.write_all(b"# Title\r\n\r\n\r\n\r\nBody   text").unwrap();
    let orchestrator = stub_orchestrator(StubOcr::new(), StubRasterizer::new(1));

    let result = orchestrator
        .extract(file.path(), &ExtractionConfig::default())
        .await
        .unwrap();

    assert_eq!(result.format, FormatTag::Markdown);
    assert_eq!(result.content(), "# Title\n\nBody text");
    assert_eq!(result.metadata["content_length"], 26);
}

#[tokio::test]
async fn test_missing_path_is_io_error() {
    let orchestrator = stub_orchestrator(StubOcr::new(), StubRasterizer::new(1));
    let err = orchestrator
        .extract("/nonexistent/docextract/report.pdf", &ExtractionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocExtractError::Io(_)), "{err:?}");
}

#[tokio::test]
async fn test_unknown_bytes_are_unsupported() {
    let orchestrator = stub_orchestrator(StubOcr::new(), StubRasterizer::new(1));
    let err = orchestrator
        .extract(DocumentHandle::from_bytes(vec![0u8, 159, 146, 150, 0, 1]), &ExtractionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DocExtractError::UnsupportedFormat(_)), "{err:?}");
}

#[tokio::test]
async fn test_chunks_cover_content() {
    let orchestrator = stub_orchestrator(StubOcr::new(), StubRasterizer::new(1));
    let text: String = (0..240).map(|i| format!("w{i:03} ")).collect();
    let config = ExtractionConfig {
        chunking_enabled: true,
        chunk_size: 500,
        chunk_overlap: 50,
        ..Default::default()
    };

    let result = orchestrator
        .extract(DocumentHandle::from_bytes(text.as_bytes().to_vec()).with_name("words.txt"), &config)
        .await
        .unwrap();
    let content = result.content();
    let chunks = result.chunks.expect("chunking was enabled");

    assert_eq!(chunks.len(), 3);
    for (index, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.metadata.chunk_index, index);
        assert_eq!(chunk.metadata.total_chunks, chunks.len());
        assert!(chunk.content.chars().count() <= 500);
        assert_eq!(&content[chunk.metadata.byte_start..chunk.metadata.byte_end], chunk.content);
    }
    for pair in chunks.windows(2) {
        let overlap = pair[0].metadata.byte_end - pair[1].metadata.byte_start;
        assert_eq!(overlap, 50);
        assert_eq!(pair[0].content[pair[0].content.len() - 50..], pair[1].content[..50]);
    }
    assert_eq!(chunks.last().unwrap().metadata.byte_end, content.len());

    let rebuilt: String = chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| if index == 0 { &chunk.content[..] } else { &chunk.content[50..] })
        .collect();
    assert_eq!(rebuilt, content);
}

#[tokio::test]
async fn test_invalid_extraction_config_is_rejected() {
    let orchestrator = stub_orchestrator(StubOcr::new(), StubRasterizer::new(1));
    for timeout_seconds in [0.0, 1e20] {
        let config = ExtractionConfig {
            timeout_seconds,
            ..Default::default()
        };
        let notes = DocumentHandle::from_bytes(b"hello world".to_vec()).with_name("a.txt");
        let err = orchestrator.extract(notes, &config).await.unwrap_err();
        assert!(matches!(err, DocExtractError::Validation { .. }), "{timeout_seconds}: {err:?}");
    }
}

#[tokio::test]
async fn test_text_mentioning_pdf_header_stays_text() {
    let orchestrator = stub_orchestrator(StubOcr::new(), StubRasterizer::new(1));
    let notes = DocumentHandle::from_bytes(b"Release notes: files now start with %PDF-1.7 as required.\n".to_vec())
        .with_name("notes.txt");

    let result = orchestrator.extract(notes, &ExtractionConfig::default()).await.unwrap();

    assert_eq!(result.format, FormatTag::PlainText);
    assert_eq!(result.metadata["extractor"], "plain-text");
    assert!(result.content().contains("%PDF-1.7 as required."));
}
