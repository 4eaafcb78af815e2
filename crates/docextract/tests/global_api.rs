//! Free functions backed by the process-wide default orchestrator.
//!
//! These share one cache, so they run serially.

use docextract::{DocumentHandle, ExtractionConfig, default_orchestrator, extract, extract_batch, extract_batch_sync, extract_sync};
use serial_test::serial;

fn note(text: &str) -> DocumentHandle {
    DocumentHandle::from_bytes(text.as_bytes().to_vec()).with_name("note.txt")
}

#[test]
#[serial]
fn test_extract_sync_plain_text() {
    let result = extract_sync(note("Synchronous  extraction\t works"), &ExtractionConfig::default()).unwrap();
    assert_eq!(result.content(), "Synchronous extraction works");
    assert_eq!(result.metadata["extractor"], "plain-text");
}

#[test]
#[serial]
fn test_extract_batch_sync_keeps_order() {
    let sources = vec![note("first"), DocumentHandle::from_bytes(vec![0u8, 0xFF, 0]), note("third")];
    let results = extract_batch_sync(sources, &ExtractionConfig::default()).unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().content(), "first");
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap().content(), "third");
}

#[tokio::test]
#[serial]
async fn test_async_free_functions_share_cache() {
    let orchestrator = default_orchestrator().unwrap();
    let config = ExtractionConfig::default();
    let before = orchestrator.cache().stats();

    extract(note("shared default cache"), &config).await.unwrap();
    let results = extract_batch(vec![note("shared default cache")], &config).await.unwrap();
    assert_eq!(results[0].as_ref().unwrap().content(), "shared default cache");

    let after = orchestrator.cache().stats();
    assert_eq!(after.misses - before.misses, 1);
    assert!(after.hits > before.hits);
}

#[tokio::test]
#[serial]
async fn test_default_orchestrator_has_builtin_extractors() {
    let orchestrator = default_orchestrator().unwrap();
    let names = orchestrator.registry().names();
    for expected in ["plain-text", "image-ocr"] {
        assert!(names.contains(&expected), "{names:?}");
    }
    #[cfg(feature = "pdf")]
    assert!(names.contains(&"pdf-text") && names.contains(&"pdf-ocr"));
}
