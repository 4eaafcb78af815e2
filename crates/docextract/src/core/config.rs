//! Configuration loading and management.
//!
//! [`ExtractionConfig`] is the per-request value object and takes part in the
//! cache key. [`OrchestratorConfig`] holds the process-level knobs (retry,
//! cache capacity, concurrency). Both can be loaded from one file:
//!
//! ```toml
//! [extraction]
//! ocr_engine = "tesseract"
//! language_hints = ["eng", "deu"]
//! chunking_enabled = true
//!
//! [orchestrator]
//! max_concurrent_extractions = 8
//!
//! [orchestrator.retry]
//! max_attempts = 5
//! ```

use crate::core::execution::ExecutionMode;
use crate::{DocExtractError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up by [`ConfigFile::discover`].
pub const CONFIG_FILE_NAME: &str = "docextract.toml";

/// OCR engine used by OCR-based extractors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngine {
    #[default]
    Tesseract,
    EasyOcr,
    PaddleOcr,
    /// Disable OCR; OCR-only documents then fail as unsupported.
    None,
}

impl OcrEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrEngine::Tesseract => "tesseract",
            OcrEngine::EasyOcr => "easyocr",
            OcrEngine::PaddleOcr => "paddleocr",
            OcrEngine::None => "none",
        }
    }
}

impl std::fmt::Display for OcrEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request extraction settings.
///
/// Two configs are equal iff every field is equal, and the serialized form is
/// part of the cache key, so any field change yields a distinct cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub ocr_engine: OcrEngine,

    /// Language codes passed to the OCR engine (ISO 639-1 or 639-3).
    #[serde(default = "default_language_hints")]
    pub language_hints: BTreeSet<String>,

    /// Skip native-text extractors whenever an OCR extractor exists for the format.
    #[serde(default)]
    pub force_ocr: bool,

    #[serde(default)]
    pub extract_tables: bool,

    #[serde(default)]
    pub chunking_enabled: bool,

    /// Maximum characters per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Budget for a single extraction attempt.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: f64,

    #[serde(default = "default_true")]
    pub cache_enabled: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ocr_engine: OcrEngine::default(),
            language_hints: default_language_hints(),
            force_ocr: false,
            extract_tables: false,
            chunking_enabled: false,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            timeout_seconds: default_timeout_seconds(),
            cache_enabled: true,
        }
    }
}

impl ExtractionConfig {
    /// Reject values no extraction could honour.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(DocExtractError::validation("chunk_size must be a positive integer"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(DocExtractError::validation(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if !self.timeout_seconds.is_finite() || self.timeout_seconds <= 0.0 {
            return Err(DocExtractError::validation(format!(
                "timeout_seconds must be a positive number, got {}",
                self.timeout_seconds
            )));
        }
        if Duration::try_from_secs_f64(self.timeout_seconds).is_err() {
            return Err(DocExtractError::validation(format!(
                "timeout_seconds is too large, got {}",
                self.timeout_seconds
            )));
        }
        if let Some(bad) = self.language_hints.iter().find(|l| l.trim().is_empty()) {
            return Err(DocExtractError::validation(format!("Invalid language hint '{bad}'")));
        }
        Ok(())
    }

    /// Per-attempt timeout. Values `Duration` cannot hold saturate to `Duration::MAX`.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds).unwrap_or(Duration::MAX)
    }

    /// Stable serialized form used for cache keys.
    pub fn fingerprint(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Backoff schedule for transient failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per extractor, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16) as i32;
        let ms = self.initial_backoff_ms as f64 * self.backoff_multiplier.max(1.0).powi(exp);
        Duration::from_millis(ms.min(self.max_backoff_ms as f64) as u64)
    }
}

/// Result cache sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_entries")]
    pub max_entries: usize,

    /// Optional bound on the summed approximate size of cached results.
    #[serde(default = "default_cache_bytes")]
    pub max_bytes: Option<usize>,

    /// Persist results as MessagePack files here instead of in memory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: default_cache_entries(),
            max_bytes: default_cache_bytes(),
            directory: None,
        }
    }
}

/// Process-level orchestrator settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub cache: CacheSettings,

    /// Upper bound on concurrently running batch items; defaults to twice the CPU count.
    #[serde(default)]
    pub max_concurrent_extractions: Option<usize>,

    #[serde(default)]
    pub execution_mode: ExecutionMode,

    /// Include the OCR engine version in cache keys.
    #[serde(default)]
    pub strict_engine_versioning: bool,
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(DocExtractError::validation("retry.max_attempts must be at least 1"));
        }
        if self.cache.max_entries == 0 {
            return Err(DocExtractError::validation("cache.max_entries must be at least 1"));
        }
        if self.max_concurrent_extractions == Some(0) {
            return Err(DocExtractError::validation(
                "max_concurrent_extractions must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn concurrency_limit(&self) -> usize {
        self.max_concurrent_extractions.unwrap_or_else(|| num_cpus::get() * 2)
    }
}

/// Both configuration sections as stored on disk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| DocExtractError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_yaml_ng::from_str(&content)
            .map_err(|e| DocExtractError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| DocExtractError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load by file extension (`.toml`, `.yaml`/`.yml`, `.json`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(DocExtractError::validation(format!(
                "Unsupported config file format: {}",
                path.display()
            ))),
        }
    }

    /// Search the current directory and its parents for `docextract.toml`.
    pub fn discover() -> Result<Option<Self>> {
        let current = std::env::current_dir()?;
        Self::discover_from(current)
    }

    /// Search `start` and its parents for `docextract.toml`.
    pub fn discover_from(start: impl Into<PathBuf>) -> Result<Option<Self>> {
        let mut current = start.into();

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    pub fn validate(&self) -> Result<()> {
        self.extraction.validate()?;
        self.orchestrator.validate()
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| DocExtractError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}

fn default_true() -> bool {
    true
}
fn default_language_hints() -> BTreeSet<String> {
    BTreeSet::from(["eng".to_string()])
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_timeout_seconds() -> f64 {
    120.0
}
fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    100
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_max_backoff_ms() -> u64 {
    5_000
}
fn default_cache_entries() -> usize {
    256
}
fn default_cache_bytes() -> Option<usize> {
    Some(256 * 1024 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = ExtractionConfig::default();
        assert_eq!(config.ocr_engine, OcrEngine::Tesseract);
        assert!(config.language_hints.contains("eng"));
        assert!(config.cache_enabled);
        assert!(!config.chunking_enabled);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_chunking() {
        let config = ExtractionConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DocExtractError::Validation { .. })));

        let config = ExtractionConfig {
            chunk_size: 0,
            chunk_overlap: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_timeout() {
        for timeout_seconds in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = ExtractionConfig {
                timeout_seconds,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{timeout_seconds} accepted");
        }
    }

    #[test]
    fn test_validate_rejects_unrepresentable_timeout() {
        let config = ExtractionConfig {
            timeout_seconds: 1e20,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DocExtractError::Validation { .. })));
        assert_eq!(config.timeout(), Duration::MAX);

        let config = ExtractionConfig {
            timeout_seconds: 1e9,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::from_secs(1_000_000_000));
    }

    #[test]
    fn test_fingerprint_depends_on_language_hints() {
        let a = ExtractionConfig::default();
        let mut b = ExtractionConfig::default();
        b.language_hints.insert("deu".to_string());
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap(), ExtractionConfig::default().fingerprint().unwrap());
    }

    #[test]
    fn test_retry_backoff_is_exponential_and_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(30), Duration::from_millis(5_000));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("docextract.toml");

        fs::write(
            &config_path,
            r#"
[extraction]
ocr_engine = "easyocr"
language_hints = ["en", "de"]
chunking_enabled = true
chunk_size = 500
chunk_overlap = 50

[orchestrator]
max_concurrent_extractions = 4
execution_mode = "cooperative"

[orchestrator.retry]
max_attempts = 5
        "#,
        )
        .unwrap();

        let config = ConfigFile::from_toml_file(&config_path).unwrap();
        assert_eq!(config.extraction.ocr_engine, OcrEngine::EasyOcr);
        assert_eq!(config.extraction.language_hints.len(), 2);
        assert_eq!(config.extraction.chunk_size, 500);
        assert_eq!(config.orchestrator.retry.max_attempts, 5);
        assert_eq!(config.orchestrator.retry.initial_backoff_ms, 100);
        assert_eq!(config.orchestrator.concurrency_limit(), 4);
        assert_eq!(config.orchestrator.execution_mode, ExecutionMode::Cooperative);
    }

    #[test]
    fn test_from_toml_file_rejects_invalid_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("bad.toml");
        fs::write(&config_path, "[extraction]\nchunk_size = 10\nchunk_overlap = 20\n").unwrap();

        assert!(ConfigFile::from_toml_file(&config_path).is_err());
    }

    #[test]
    fn test_from_json_and_yaml_files() {
        let dir = tempdir().unwrap();
        let json_path = dir.path().join("config.json");
        fs::write(&json_path, r#"{"extraction": {"force_ocr": true, "ocr_engine": "paddleocr"}}"#).unwrap();
        let yaml_path = dir.path().join("config.yaml");
        fs::write(&yaml_path, "extraction:\n  extract_tables: true\n  ocr_engine: none\n").unwrap();

        let json = ConfigFile::from_file(&json_path).unwrap();
        assert!(json.extraction.force_ocr);
        assert_eq!(json.extraction.ocr_engine, OcrEngine::PaddleOcr);

        let yaml = ConfigFile::from_file(&yaml_path).unwrap();
        assert!(yaml.extraction.extract_tables);
        assert_eq!(yaml.extraction.ocr_engine, OcrEngine::None);
    }

    #[test]
    fn test_from_file_unknown_extension() {
        assert!(ConfigFile::from_file("config.ini").is_err());
    }

    #[test]
    fn test_discover_from_parent_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "[extraction]\nforce_ocr = true\n").unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let found = ConfigFile::discover_from(&nested).unwrap().unwrap();
        assert!(found.extraction.force_ocr);
    }
}
