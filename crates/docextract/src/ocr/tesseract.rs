//! Tesseract adapter driving the `tesseract` CLI.
//!
//! The image is piped to `tesseract stdin stdout -l <langs> tsv` and the TSV
//! word table is folded into lines.

use crate::Result;
use crate::core::config::OcrEngine;
use crate::error::DocExtractError;
use crate::ocr::process::EngineCommand;
use crate::ocr::validation::TESSERACT_SUPPORTED_LANGUAGE_CODES;
use crate::plugins::{OcrBackend, OcrOptions, Plugin, RecognizedText};
use crate::types::BoundingBox;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::path::PathBuf;

pub const TSV_WORD_LEVEL: u32 = 5;
pub const TSV_MIN_FIELDS: usize = 12;

const ENGINE_NAME: &str = "tesseract";

#[derive(Debug)]
pub struct TesseractBackend {
    binary: PathBuf,
    /// Page segmentation mode passed as `--psm`.
    psm: u8,
    version: OnceCell<String>,
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TesseractBackend {
    pub fn new() -> Self {
        Self::with_binary("tesseract")
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            psm: 3,
            version: OnceCell::new(),
        }
    }

    pub fn with_psm(mut self, psm: u8) -> Self {
        self.psm = psm;
        self
    }
}

impl Plugin for TesseractBackend {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    /// First line of `tesseract --version`, or `"unavailable"`.
    fn version(&self) -> String {
        self.version
            .get_or_init(|| {
                std::process::Command::new(&self.binary)
                    .arg("--version")
                    .output()
                    .ok()
                    .and_then(|out| {
                        // Older releases print the banner on stderr.
                        let text = if out.stdout.is_empty() { out.stderr } else { out.stdout };
                        String::from_utf8_lossy(&text).lines().next().map(|l| l.trim().to_string())
                    })
                    .unwrap_or_else(|| "unavailable".to_string())
            })
            .clone()
    }

    fn description(&self) -> &str {
        "Tesseract OCR via the tesseract command-line tool"
    }
}

#[async_trait]
impl OcrBackend for TesseractBackend {
    async fn recognize(&self, image: &[u8], options: &OcrOptions) -> Result<Vec<RecognizedText>> {
        let output = EngineCommand::new(ENGINE_NAME, &self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(options.languages.join("+"))
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("tsv")
            .stdin(image.to_vec())
            .run(options.timeout)
            .await?;

        parse_tsv(&String::from_utf8_lossy(&output))
    }

    fn engine(&self) -> OcrEngine {
        OcrEngine::Tesseract
    }

    fn supported_languages(&self) -> Vec<String> {
        TESSERACT_SUPPORTED_LANGUAGE_CODES.iter().map(|s| s.to_string()).collect()
    }

    fn supports_language(&self, lang: &str) -> bool {
        TESSERACT_SUPPORTED_LANGUAGE_CODES.contains(lang)
    }
}

struct LineAccumulator {
    key: (u32, u32, u32, u32),
    words: Vec<String>,
    confidence_sum: f64,
    region: BoundingBox,
}

impl LineAccumulator {
    fn finish(self) -> RecognizedText {
        let count = self.words.len().max(1) as f64;
        RecognizedText {
            text: self.words.join(" "),
            confidence: (self.confidence_sum / count / 100.0).clamp(0.0, 1.0),
            region: Some(self.region),
        }
    }
}

/// Fold Tesseract TSV output into lines.
///
/// Words (level 5) sharing page, block, paragraph and line numbers form one
/// line. Output that is non-empty but lacks the TSV header is malformed.
pub fn parse_tsv(tsv: &str) -> Result<Vec<RecognizedText>> {
    let mut rows = tsv.lines();
    match rows.next() {
        None => return Ok(Vec::new()),
        Some(header) if header.trim().is_empty() => return Ok(Vec::new()),
        Some(header) if header.starts_with("level") => {}
        Some(header) => {
            return Err(DocExtractError::malformed_output(
                ENGINE_NAME,
                format!("expected TSV header, got '{}'", header.chars().take(80).collect::<String>()),
            ));
        }
    }

    let mut lines = Vec::new();
    let mut current: Option<LineAccumulator> = None;

    for row in rows {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < TSV_MIN_FIELDS {
            continue;
        }
        if fields[0].trim().parse::<u32>().ok() != Some(TSV_WORD_LEVEL) {
            continue;
        }

        let text = fields[11].trim();
        let confidence = fields[10].trim().parse::<f64>().unwrap_or(-1.0);
        if text.is_empty() || confidence < 0.0 {
            continue;
        }

        let num = |i: usize| fields[i].trim().parse::<u32>().unwrap_or(0);
        let key = (num(1), num(2), num(3), num(4));
        let region = BoundingBox {
            left: num(6),
            top: num(7),
            width: num(8),
            height: num(9),
        };

        match current.as_mut() {
            Some(line) if line.key == key => {
                line.words.push(text.to_string());
                line.confidence_sum += confidence;
                line.region = line.region.union(&region);
            }
            _ => {
                if let Some(done) = current.take() {
                    lines.push(done.finish());
                }
                current = Some(LineAccumulator {
                    key,
                    words: vec![text.to_string()],
                    confidence_sum: confidence,
                    region,
                });
            }
        }
    }

    if let Some(done) = current {
        lines.push(done.finish());
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrFailure;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_parse_tsv_groups_words_into_lines() {
        let tsv = format!(
            "{HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t640\t480\t-1\t\n\
             5\t1\t1\t1\t1\t1\t100\t50\t80\t30\t95.5\tHello\n\
             5\t1\t1\t1\t1\t2\t190\t50\t70\t30\t92.5\tWorld\n\
             5\t1\t1\t1\t2\t1\t100\t90\t60\t30\t80\tSecond\n"
        );

        let lines = parse_tsv(&tsv).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Hello World");
        assert!((lines[0].confidence - 0.94).abs() < 1e-9);
        assert_eq!(
            lines[0].region,
            Some(BoundingBox {
                left: 100,
                top: 50,
                width: 160,
                height: 30
            })
        );
        assert_eq!(lines[1].text, "Second");
    }

    #[test]
    fn test_parse_tsv_skips_blank_and_short_rows() {
        let tsv = format!("{HEADER}\n5\t1\t1\t1\t1\t1\t0\t0\t1\t1\t90\t   \n5\t1\t1\n");
        assert!(parse_tsv(&tsv).unwrap().is_empty());
    }

    #[test]
    fn test_parse_tsv_empty_output() {
        assert!(parse_tsv("").unwrap().is_empty());
        assert!(parse_tsv(HEADER).unwrap().is_empty());
    }

    #[test]
    fn test_parse_tsv_rejects_non_tsv() {
        let err = parse_tsv("Error opening data file").unwrap_err();
        assert!(matches!(
            err,
            DocExtractError::OcrEngine {
                cause: OcrFailure::MalformedOutput { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_supports_tesseract_codes_only() {
        let backend = TesseractBackend::new();
        assert!(backend.supports_language("eng"));
        assert!(!backend.supports_language("en"));
        assert_eq!(backend.engine(), OcrEngine::Tesseract);
    }

    #[test]
    fn test_version_of_missing_binary() {
        let backend = TesseractBackend::with_binary("/nonexistent/tesseract");
        assert_eq!(backend.version(), "unavailable");
    }
}
