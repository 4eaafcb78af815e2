//! Error types for docextract.
//!
//! Every fallible operation returns [`DocExtractError`]. The enum is `Clone`
//! because a failed in-flight computation is shared with every caller that
//! coalesced onto it, so sources are held behind `Arc`.
//!
//! # Propagation
//!
//! - `Io` from reading a path source always bubbles up unchanged.
//! - `Extraction { kind: Timeout }` and timed-out OCR processes are transient and
//!   retried by the orchestrator up to its attempt budget.
//! - `OcrEngine { cause: MissingBinary }` and malformed documents fail immediately.
//! - `Cache` never fails a request; the orchestrator logs it and carries on as
//!   if the lookup missed.
//! - `Chunking` never fails a request; it becomes a [`crate::types::ProcessingWarning`].
//!
//! # Example
//!
//! ```rust
//! use docextract::{DocExtractError, Result};
//!
//! fn check(size: usize) -> Result<()> {
//!     if size == 0 {
//!         return Err(DocExtractError::validation("chunk_size must be positive"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check(0).is_err());
//! ```
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias using `DocExtractError`.
pub type Result<T> = std::result::Result<T, DocExtractError>;

type SharedSource = Arc<dyn std::error::Error + Send + Sync>;

/// Failure classes an extractor can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionErrorKind {
    /// The document is corrupt or violates its format.
    Malformed,
    /// An attempt ran past the configured timeout.
    Timeout,
    /// Reading auxiliary data failed.
    Io,
}

impl fmt::Display for ExtractionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Malformed => "malformed",
            Self::Timeout => "timeout",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

/// Why an OCR engine invocation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrFailure {
    /// The engine ran but did not finish successfully.
    ProcessFailure {
        exit_status: Option<i32>,
        timed_out: bool,
        message: String,
    },
    /// The engine binary or its runtime package is not installed.
    MissingBinary { message: String },
    /// The engine produced output we could not parse.
    MalformedOutput { message: String },
}

impl fmt::Display for OcrFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProcessFailure {
                timed_out: true,
                message,
                ..
            } => write!(f, "process timed out: {message}"),
            Self::ProcessFailure {
                exit_status: Some(code),
                message,
                ..
            } => write!(f, "process exited with status {code}: {message}"),
            Self::ProcessFailure { message, .. } => write!(f, "process failed: {message}"),
            Self::MissingBinary { message } => write!(f, "missing binary: {message}"),
            Self::MalformedOutput { message } => write!(f, "malformed output: {message}"),
        }
    }
}

/// Stage of the extraction state machine an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Detecting,
    CacheLookup,
    Selecting,
    Extracting,
    PostProcessing,
    CacheStore,
}

/// Main error type for all docextract operations.
#[derive(Debug, Clone, Error)]
pub enum DocExtractError {
    #[error("IO error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction error ({kind}): {message}")]
    Extraction {
        kind: ExtractionErrorKind,
        message: String,
        #[source]
        source: Option<SharedSource>,
    },

    #[error("OCR engine '{engine}' failed: {cause}")]
    OcrEngine { engine: String, cause: OcrFailure },

    #[error("Cache error: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<SharedSource>,
    },

    #[error("Chunking error: {message}")]
    Chunking {
        message: String,
        #[source]
        source: Option<SharedSource>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<SharedSource>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<SharedSource>,
    },

    #[error("Extraction cancelled")]
    Cancelled,

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for DocExtractError {
    fn from(err: std::io::Error) -> Self {
        DocExtractError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for DocExtractError {
    fn from(err: serde_json::Error) -> Self {
        DocExtractError::serialization_with_source(err.to_string(), err)
    }
}

impl From<rmp_serde::encode::Error> for DocExtractError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        DocExtractError::serialization_with_source(err.to_string(), err)
    }
}

impl From<rmp_serde::decode::Error> for DocExtractError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        DocExtractError::serialization_with_source(err.to_string(), err)
    }
}

#[cfg(feature = "excel")]
impl From<calamine::Error> for DocExtractError {
    fn from(err: calamine::Error) -> Self {
        DocExtractError::malformed_with_source(err.to_string(), err)
    }
}

#[cfg(feature = "pdf")]
impl From<lopdf::Error> for DocExtractError {
    fn from(err: lopdf::Error) -> Self {
        DocExtractError::malformed_with_source(format!("Failed to parse PDF: {err}"), err)
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Arc::new(source)),
                }
            }
        }
    };
}

macro_rules! extraction_constructor {
    ($name:ident, $kind:ident) => {
        pastey::paste! {
            #[doc = "Create an extraction error of kind " $kind]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::Extraction {
                    kind: ExtractionErrorKind::$kind,
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create an extraction error of kind " $kind " with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::Extraction {
                    kind: ExtractionErrorKind::$kind,
                    message: message.into(),
                    source: Some(Arc::new(source)),
                }
            }
        }
    };
}

impl DocExtractError {
    error_constructor!(cache, Cache);
    error_constructor!(chunking, Chunking);
    error_constructor!(validation, Validation);
    error_constructor!(serialization, Serialization);
    extraction_constructor!(malformed, Malformed);
    extraction_constructor!(extraction_io, Io);

    /// An attempt exceeded its time budget.
    pub fn timeout(seconds: f64) -> Self {
        Self::Extraction {
            kind: ExtractionErrorKind::Timeout,
            message: format!("extraction exceeded {seconds}s"),
            source: None,
        }
    }

    pub fn ocr_engine<S: Into<String>>(engine: S, cause: OcrFailure) -> Self {
        Self::OcrEngine {
            engine: engine.into(),
            cause,
        }
    }

    pub fn missing_binary<S: Into<String>, M: Into<String>>(engine: S, message: M) -> Self {
        Self::ocr_engine(
            engine,
            OcrFailure::MissingBinary {
                message: message.into(),
            },
        )
    }

    pub fn malformed_output<S: Into<String>, M: Into<String>>(engine: S, message: M) -> Self {
        Self::ocr_engine(
            engine,
            OcrFailure::MalformedOutput {
                message: message.into(),
            },
        )
    }

    /// Whether the orchestrator may retry the attempt that produced this error.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Extraction { kind, .. } => *kind == ExtractionErrorKind::Timeout,
            Self::OcrEngine {
                cause: OcrFailure::ProcessFailure { timed_out, .. },
                ..
            } => *timed_out,
            _ => false,
        }
    }

    /// The state-machine stage this kind of error is raised from.
    pub fn stage(&self) -> Stage {
        match self {
            Self::UnsupportedFormat(_) => Stage::Selecting,
            Self::Extraction { .. } | Self::OcrEngine { .. } | Self::Cancelled => Stage::Extracting,
            Self::Cache { .. } => Stage::CacheLookup,
            Self::Chunking { .. } => Stage::PostProcessing,
            Self::Io(_) | Self::Validation { .. } => Stage::Detecting,
            Self::Serialization { .. } => Stage::CacheStore,
            Self::LockPoisoned(_) | Self::Other(_) => Stage::Extracting,
        }
    }
}
