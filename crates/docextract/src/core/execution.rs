//! Execution mode tracking using tokio task-local storage.
//!
//! The orchestrator scopes every request with its [`ExecutionMode`] so that
//! extractors can offload CPU-bound parsing without taking the mode as a
//! parameter. In cooperative mode parsing runs inline on the calling task and
//! the only suspension points are process and file I/O.

use crate::{DocExtractError, Result};
use serde::{Deserialize, Serialize};
use tokio::task_local;

/// How the orchestrator schedules work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Batch items run as separate tasks, parsing runs on the blocking pool.
    #[default]
    Parallel,
    /// Everything is polled on the caller's task. Works on a current-thread runtime.
    Cooperative,
}

task_local! {
    static EXECUTION_MODE: ExecutionMode;
}

/// Mode of the current task; `Parallel` outside any scope.
pub fn current_mode() -> ExecutionMode {
    EXECUTION_MODE.try_with(|mode| *mode).unwrap_or_default()
}

/// Run a future with `mode` set for its duration.
pub async fn with_execution_mode<F, T>(mode: ExecutionMode, future: F) -> T
where
    F: std::future::Future<Output = T>,
{
    EXECUTION_MODE.scope(mode, future).await
}

/// Run CPU-bound work according to the current mode.
///
/// In parallel mode the closure moves to the blocking pool; in cooperative mode
/// it runs to completion before the caller's task yields again.
pub async fn run_blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match current_mode() {
        ExecutionMode::Cooperative => f(),
        ExecutionMode::Parallel => tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| DocExtractError::Other(format!("Blocking extraction task failed: {e}")))?,
    }
}
