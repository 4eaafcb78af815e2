//! Core extraction orchestration.
//!
//! - **Entry points**: [`Orchestrator`] and the free `extract*` functions
//! - **Detection**: signature, extension and text sniffing in [`mime`]
//! - **Configuration**: per-request [`ExtractionConfig`] and process-wide [`OrchestratorConfig`]
//! - **Pipeline**: normalization, metadata merge and chunking of raw output
//! - **Execution**: parallel or cooperative scheduling of CPU-bound work
//!
//! # Example
//!
//! ```rust,no_run
//! use docextract::core::config::ExtractionConfig;
//! use docextract::core::extractor::extract;
//!
//! # async fn example() -> docextract::Result<()> {
//! let result = extract("document.pdf", &ExtractionConfig::default()).await?;
//! println!("Extracted content: {}", result.content());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod execution;
pub mod extractor;
pub mod formats;
pub mod io;
pub mod mime;
pub mod pipeline;

pub use config::{CacheSettings, ConfigFile, ExtractionConfig, OcrEngine, OrchestratorConfig, RetryPolicy};
pub use execution::ExecutionMode;
pub use extractor::{
    Orchestrator, OrchestratorBuilder, default_orchestrator, extract, extract_batch, extract_batch_sync, extract_sync,
};
