//! EasyOCR adapter.

use crate::Result;
use crate::core::config::OcrEngine;
use crate::ocr::python::{group_lines, run_script};
use crate::ocr::validation::EASYOCR_SUPPORTED_LANGUAGE_CODES;
use crate::plugins::{OcrBackend, OcrOptions, Plugin, RecognizedText};
use async_trait::async_trait;
use std::path::PathBuf;

const ENGINE_NAME: &str = "easyocr";

const SCRIPT: &str = r#"
import json, sys
try:
    import easyocr
except ImportError as exc:
    sys.stderr.write("easyocr is not installed: %s" % exc)
    sys.exit(3)
path, langs, gpu = sys.argv[1], sys.argv[2].split(","), sys.argv[3] == "1"
reader = easyocr.Reader(langs, gpu=gpu, verbose=False)
out = [
    {"box": [[float(x), float(y)] for x, y in box], "text": text, "confidence": float(conf)}
    for box, text, conf in reader.readtext(path)
]
print(json.dumps(out))
"#;

const VERSION_SCRIPT: &str = "import easyocr; print(easyocr.__version__)";

/// Runs EasyOCR through a Python interpreter.
///
/// Each call loads the recognition model, so calls are serialized to keep
/// memory bounded.
#[derive(Debug)]
pub struct EasyOcrBackend {
    python: PathBuf,
    use_gpu: bool,
}

impl Default for EasyOcrBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl EasyOcrBackend {
    pub fn new() -> Self {
        Self {
            python: PathBuf::from("python3"),
            use_gpu: false,
        }
    }

    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_gpu(mut self, use_gpu: bool) -> Self {
        self.use_gpu = use_gpu;
        self
    }
}

impl Plugin for EasyOcrBackend {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn version(&self) -> String {
        python_module_version(&self.python, VERSION_SCRIPT)
    }

    fn description(&self) -> &str {
        "EasyOCR via a Python subprocess"
    }
}

#[async_trait]
impl OcrBackend for EasyOcrBackend {
    async fn recognize(&self, image: &[u8], options: &OcrOptions) -> Result<Vec<RecognizedText>> {
        let args = [
            options.languages.join(","),
            if self.use_gpu { "1" } else { "0" }.to_string(),
        ];
        let detections = run_script(ENGINE_NAME, &self.python, SCRIPT, image, &args, options.timeout).await?;
        Ok(group_lines(detections))
    }

    fn engine(&self) -> OcrEngine {
        OcrEngine::EasyOcr
    }

    fn supported_languages(&self) -> Vec<String> {
        EASYOCR_SUPPORTED_LANGUAGE_CODES.iter().map(|s| s.to_string()).collect()
    }

    fn supports_language(&self, lang: &str) -> bool {
        EASYOCR_SUPPORTED_LANGUAGE_CODES.contains(lang)
    }

    fn is_concurrent_safe(&self) -> bool {
        false
    }
}

/// Ask the interpreter for a package version, `"unavailable"` when it fails.
pub(crate) fn python_module_version(python: &std::path::Path, script: &str) -> String {
    std::process::Command::new(python)
        .arg("-c")
        .arg(script)
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unavailable".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_support() {
        let backend = EasyOcrBackend::new();
        assert!(backend.supports_language("en"));
        assert!(backend.supports_language("ch_sim"));
        assert!(!backend.supports_language("eng"));
        assert!(!backend.is_concurrent_safe());
    }

    #[test]
    fn test_version_with_missing_interpreter() {
        let backend = EasyOcrBackend::new().with_python("/nonexistent/python3");
        assert_eq!(backend.version(), "unavailable");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_interpreter_is_missing_binary() {
        use crate::error::{DocExtractError, OcrFailure};
        use std::time::Duration;

        let backend = EasyOcrBackend::new().with_python("/nonexistent/python3");
        let options = OcrOptions {
            languages: vec!["en".to_string()],
            timeout: Duration::from_secs(5),
        };
        let err = backend.recognize(b"png", &options).await.unwrap_err();
        assert!(matches!(
            err,
            DocExtractError::OcrEngine {
                cause: OcrFailure::MissingBinary { .. },
                ..
            }
        ));
    }
}
