//! PaddleOCR adapter.

use crate::Result;
use crate::core::config::OcrEngine;
use crate::ocr::easyocr::python_module_version;
use crate::ocr::python::{group_lines, run_script};
use crate::ocr::validation::{PADDLEOCR_SUPPORTED_LANGUAGE_CODES, default_language};
use crate::plugins::{OcrBackend, OcrOptions, Plugin, RecognizedText};
use async_trait::async_trait;
use std::path::PathBuf;

const ENGINE_NAME: &str = "paddleocr";

const SCRIPT: &str = r#"
import json, sys
try:
    from paddleocr import PaddleOCR
except ImportError as exc:
    sys.stderr.write("paddleocr is not installed: %s" % exc)
    sys.exit(3)
path, lang = sys.argv[1], sys.argv[2]
ocr = PaddleOCR(lang=lang, use_angle_cls=True, show_log=False)
out = []
for page in ocr.ocr(path, cls=True) or []:
    for box, (text, conf) in page or []:
        out.append({"box": [[float(x), float(y)] for x, y in box], "text": text, "confidence": float(conf)})
print(json.dumps(out))
"#;

const VERSION_SCRIPT: &str = "import paddleocr; print(paddleocr.__version__)";

/// Runs PaddleOCR through a Python interpreter.
///
/// PaddleOCR loads one model per language, so only the first language is used.
#[derive(Debug)]
pub struct PaddleOcrBackend {
    python: PathBuf,
}

impl Default for PaddleOcrBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PaddleOcrBackend {
    pub fn new() -> Self {
        Self {
            python: PathBuf::from("python3"),
        }
    }

    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python = python.into();
        self
    }
}

impl Plugin for PaddleOcrBackend {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn version(&self) -> String {
        python_module_version(&self.python, VERSION_SCRIPT)
    }

    fn description(&self) -> &str {
        "PaddleOCR via a Python subprocess"
    }
}

#[async_trait]
impl OcrBackend for PaddleOcrBackend {
    async fn recognize(&self, image: &[u8], options: &OcrOptions) -> Result<Vec<RecognizedText>> {
        let lang = options
            .languages
            .first()
            .cloned()
            .unwrap_or_else(|| default_language(OcrEngine::PaddleOcr).to_string());
        if options.languages.len() > 1 {
            tracing::debug!("PaddleOCR uses one model per call; ignoring {:?}", &options.languages[1..]);
        }

        let detections = run_script(ENGINE_NAME, &self.python, SCRIPT, image, &[lang], options.timeout).await?;
        Ok(group_lines(detections))
    }

    fn engine(&self) -> OcrEngine {
        OcrEngine::PaddleOcr
    }

    fn supported_languages(&self) -> Vec<String> {
        PADDLEOCR_SUPPORTED_LANGUAGE_CODES.iter().map(|s| s.to_string()).collect()
    }

    fn supports_language(&self, lang: &str) -> bool {
        PADDLEOCR_SUPPORTED_LANGUAGE_CODES.contains(lang)
    }

    fn is_concurrent_safe(&self) -> bool {
        false
    }
}
