//! Running OCR engines as child processes.
//!
//! Every child is spawned with `kill_on_drop(true)`: when the awaiting future
//! is dropped (timeout, caller cancellation, a cancelled batch) the process is
//! killed instead of being left to finish in the background.

use crate::error::{DocExtractError, OcrFailure, Result};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Longest stderr excerpt carried into error messages.
const STDERR_EXCERPT_LEN: usize = 512;

/// A single engine invocation.
#[derive(Debug, Clone)]
pub struct EngineCommand {
    /// Engine name used in errors.
    pub engine: String,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Bytes written to the child's stdin, which is closed afterwards.
    pub stdin: Option<Vec<u8>>,
    /// Exit code the wrapper uses to report a missing runtime package.
    pub missing_dependency_exit_code: Option<i32>,
}

impl EngineCommand {
    pub fn new(engine: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            engine: engine.into(),
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            missing_dependency_exit_code: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn stdin(mut self, bytes: Vec<u8>) -> Self {
        self.stdin = Some(bytes);
        self
    }

    pub fn missing_dependency_exit_code(mut self, code: i32) -> Self {
        self.missing_dependency_exit_code = Some(code);
        self
    }

    /// Run to completion within `timeout` and return stdout.
    pub async fn run(&self, timeout: Duration) -> Result<Vec<u8>> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(if self.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| self.spawn_error(e))?;
        let stdin = child.stdin.take();
        let input = self.stdin.as_deref();

        let write_input = async move {
            if let (Some(mut pipe), Some(bytes)) = (stdin, input) {
                // The engine may exit before consuming its input; its exit status says more.
                if let Err(e) = pipe.write_all(bytes).await {
                    tracing::debug!("Writing to {} stdin failed: {}", self.engine, e);
                }
                let _ = pipe.shutdown().await;
            }
        };

        let run = async { tokio::join!(write_input, child.wait_with_output()).1 };

        let output = match tokio::time::timeout(timeout, run).await {
            Ok(output) => output.map_err(|e| self.process_failure(None, format!("waiting for process failed: {e}")))?,
            Err(_) => {
                tracing::warn!("{} exceeded {:?} and was killed", self.engine, timeout);
                return Err(DocExtractError::ocr_engine(
                    &self.engine,
                    OcrFailure::ProcessFailure {
                        exit_status: None,
                        timed_out: true,
                        message: format!("no result after {:.1}s", timeout.as_secs_f64()),
                    },
                ));
            }
        };

        if !output.status.success() {
            let stderr = stderr_excerpt(&output.stderr);
            let code = output.status.code();
            if code.is_some() && code == self.missing_dependency_exit_code {
                return Err(DocExtractError::missing_binary(&self.engine, stderr));
            }
            return Err(self.process_failure(code, stderr));
        }

        Ok(output.stdout)
    }

    fn spawn_error(&self, err: std::io::Error) -> DocExtractError {
        if err.kind() == ErrorKind::NotFound {
            DocExtractError::missing_binary(
                &self.engine,
                format!("'{}' not found on PATH", self.program.display()),
            )
        } else {
            self.process_failure(None, format!("failed to start '{}': {err}", self.program.display()))
        }
    }

    fn process_failure(&self, exit_status: Option<i32>, message: String) -> DocExtractError {
        DocExtractError::ocr_engine(
            &self.engine,
            OcrFailure::ProcessFailure {
                exit_status,
                timed_out: false,
                message,
            },
        )
    }
}

fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    match trimmed.char_indices().nth(STDERR_EXCERPT_LEN) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
