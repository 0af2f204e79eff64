//! Subprocess-isolated analysis runner.
//!
//! Shields a long-running bridge from decoder crashes and memory faults by
//! running each analysis in a child `layerbridge analyze` invocation. The
//! child's stdout is the serialized layer array; a non-zero exit carries an
//! `{"error": ...}` body on stdout, which is surfaced as the failure
//! message.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use layerbridge_extract::LayerRecord;
use serde::Deserialize;
use thiserror::Error;

/// Default timeout for one child analysis (2 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Errors running an isolated analysis.
#[derive(Debug, Error)]
pub enum SubprocessError {
    /// The layerbridge executable could not be located.
    #[error("Failed to locate the layerbridge executable: {0}")]
    Executable(#[source] std::io::Error),

    /// The child process could not be spawned.
    #[error("Failed to spawn analysis subprocess: {0}")]
    Spawn(#[source] std::io::Error),

    /// The child did not finish within the configured timeout.
    #[error("Analysis subprocess timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The child exited non-zero; `output` carries its diagnostics.
    #[error("Analysis subprocess exited with status {exit_code}: {output}")]
    NonZeroExit { exit_code: i32, output: String },

    /// The child exited zero but its stdout was not a layer array.
    #[error("Analysis subprocess produced unparseable output: {0}")]
    BadOutput(#[source] serde_json::Error),

    /// Waiting on the child failed.
    #[error("Failed to wait for analysis subprocess: {0}")]
    Wait(#[source] std::io::Error),
}

/// Configuration for the subprocess runner.
#[derive(Debug, Clone)]
pub struct SubprocessConfig {
    /// Executable to invoke; defaults to the current binary.
    pub program: Option<PathBuf>,
    /// Timeout for one child invocation.
    pub timeout: Duration,
}

impl Default for SubprocessConfig {
    fn default() -> Self {
        Self {
            program: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Runs document analysis in an isolated child process.
#[derive(Debug, Clone, Default)]
pub struct SubprocessRunner {
    config: SubprocessConfig,
}

impl SubprocessRunner {
    /// Creates a runner with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a runner with custom configuration.
    pub fn with_config(config: SubprocessConfig) -> Self {
        Self { config }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &SubprocessConfig {
        &self.config
    }

    /// Analyzes `path` in a child process, materializing embedded assets
    /// into `extract_dir`.
    pub fn analyze(
        &self,
        path: &Path,
        extract_dir: &Path,
    ) -> Result<Vec<LayerRecord>, SubprocessError> {
        let program = match &self.config.program {
            Some(program) => program.clone(),
            None => std::env::current_exe().map_err(SubprocessError::Executable)?,
        };

        let mut cmd = Command::new(program);
        cmd.arg("analyze")
            .arg(path)
            .arg("--extract-dir")
            .arg(extract_dir);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd.spawn().map_err(SubprocessError::Spawn)?;
        let captured = wait_with_timeout(child, self.config.timeout)?;

        let stdout = String::from_utf8_lossy(&captured.stdout).into_owned();
        if !captured.status.success() {
            let exit_code = captured.status.code().unwrap_or(-1);
            return Err(SubprocessError::NonZeroExit {
                exit_code,
                output: extract_diagnostic(&stdout, &captured.stderr),
            });
        }

        serde_json::from_str(&stdout).map_err(SubprocessError::BadOutput)
    }
}

struct CapturedOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Error body emitted by `layerbridge analyze` on failure.
#[derive(Debug, Deserialize)]
struct ErrorReport {
    error: String,
}

/// Prefers the child's structured error report, then raw stdout, then
/// stderr.
fn extract_diagnostic(stdout: &str, stderr: &[u8]) -> String {
    if let Ok(report) = serde_json::from_str::<ErrorReport>(stdout) {
        return report.error;
    }
    let trimmed = stdout.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    String::from_utf8_lossy(stderr).trim().to_string()
}

/// Waits for a child with a timeout, killing it on expiry.
///
/// stdout/stderr are drained on background threads so a child producing
/// more output than the pipe buffer holds cannot deadlock against the
/// polling loop.
fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<CapturedOutput, SubprocessError> {
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Ok(CapturedOutput {
                    status,
                    stdout: join_reader(stdout_reader),
                    stderr: join_reader(stderr_reader),
                });
            }
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SubprocessError::Timeout {
                        timeout_secs: timeout.as_secs(),
                    });
                }
                thread::sleep(Duration::from_millis(50));
            }
            Err(source) => return Err(SubprocessError::Wait(source)),
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    source.map(|mut stream| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = stream.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
