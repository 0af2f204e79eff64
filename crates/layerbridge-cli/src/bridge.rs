//! File-poll bridge loop.
//!
//! Watches a shared data directory for `request.json`, runs the requested
//! analysis, and atomically publishes `result.json`. One request is in
//! flight at a time; the request file's existence is the only queue. The
//! loop never terminates because of a processing failure; every error is
//! folded into a well-formed failure envelope.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{error, info, warn};
use thiserror::Error;

use crate::pipeline;
use crate::protocol::{BridgeRequest, ResultEnvelope, INVALID_REQUEST};
use crate::subprocess::SubprocessRunner;

/// Request file consumed by the bridge.
pub const REQUEST_FILE: &str = "request.json";
/// Result file published by the bridge.
pub const RESULT_FILE: &str = "result.json";
/// Default poll interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

/// Outcome of a single poll pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// No request file present.
    Idle,
    /// A request was consumed and its result published.
    Handled,
    /// A request was handled but the result could not be published; the
    /// request file is left in place so the next pass retries.
    PublishFailed,
}

/// How the bridge executes analysis requests.
#[derive(Debug, Clone)]
pub enum Executor {
    /// Analysis runs on the bridge thread.
    InProcess,
    /// Analysis runs in a child process, isolating decoder crashes per
    /// request.
    Isolated(SubprocessRunner),
}

/// Startup errors for the bridge loop.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The data directory could not be created.
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
enum PublishError {
    #[error("failed to stage result: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to replace result file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Debug, Error)]
enum RequestError {
    #[error("unreadable request file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid request JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Long-running file-poll bridge over a shared data directory.
pub struct Bridge {
    data_dir: PathBuf,
    extract_dir: PathBuf,
    interval: Duration,
    executor: Executor,
}

impl Bridge {
    /// Creates a bridge over `data_dir`, extracting embedded assets into
    /// `extract_dir`, with the default poll interval.
    pub fn new(data_dir: impl Into<PathBuf>, extract_dir: impl Into<PathBuf>, executor: Executor) -> Self {
        Self {
            data_dir: data_dir.into(),
            extract_dir: extract_dir.into(),
            interval: DEFAULT_INTERVAL,
            executor,
        }
    }

    /// Sets the poll interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Path of the well-known request file.
    pub fn request_path(&self) -> PathBuf {
        self.data_dir.join(REQUEST_FILE)
    }

    /// Path of the well-known result file.
    pub fn result_path(&self) -> PathBuf {
        self.data_dir.join(RESULT_FILE)
    }

    /// Runs the poll loop until the process is killed.
    pub fn run(&self) -> Result<(), BridgeError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| BridgeError::CreateDataDir {
            path: self.data_dir.clone(),
            source,
        })?;
        info!("bridge watching {}", self.data_dir.display());
        loop {
            self.poll_once();
            std::thread::sleep(self.interval);
        }
    }

    /// One pass of the Idle -> RequestSeen -> Processing -> Publishing
    /// cycle. Processing failures become failure envelopes; only a publish
    /// failure leaves the request in place for a retry.
    pub fn poll_once(&self) -> Tick {
        let request_path = self.request_path();
        if !request_path.exists() {
            return Tick::Idle;
        }

        let result = self.handle_request(&request_path);
        match self.publish(&result) {
            Ok(()) => {
                // The consumed request is removed only after the result is
                // durably in place, so the caller never sees a gap where
                // both files are missing.
                if let Err(source) = fs::remove_file(&request_path) {
                    warn!("failed to remove consumed request: {source}");
                }
                Tick::Handled
            }
            Err(source) => {
                error!("failed to publish result: {source}");
                Tick::PublishFailed
            }
        }
    }

    fn handle_request(&self, request_path: &Path) -> ResultEnvelope {
        let request = match read_request(request_path) {
            Ok(request) => request,
            Err(source) => {
                warn!("malformed request: {source}");
                return ResultEnvelope::failure(format!("Malformed request: {source}"));
            }
        };
        match (request.cmd.as_deref(), request.path.as_deref()) {
            (Some("analyze"), Some(path)) if !path.is_empty() => self.analyze(Path::new(path)),
            _ => ResultEnvelope::failure(INVALID_REQUEST),
        }
    }

    fn analyze(&self, path: &Path) -> ResultEnvelope {
        info!("analyzing {}", path.display());
        let outcome = match &self.executor {
            Executor::InProcess => {
                pipeline::analyze_document(path, &self.extract_dir).map_err(|e| e.to_string())
            }
            Executor::Isolated(runner) => runner
                .analyze(path, &self.extract_dir)
                .map_err(|e| e.to_string()),
        };
        match outcome {
            Ok(layers) => ResultEnvelope::success(layers, path.display().to_string()),
            Err(message) => ResultEnvelope::failure(message),
        }
    }

    /// Writes the envelope to a temporary file in the data directory and
    /// renames it over the result file, so a concurrent reader only ever
    /// observes a complete document.
    fn publish(&self, result: &ResultEnvelope) -> Result<(), PublishError> {
        let mut staged = tempfile::NamedTempFile::new_in(&self.data_dir)?;
        serde_json::to_writer_pretty(&mut staged, result)?;
        staged.persist(self.result_path())?;
        Ok(())
    }
}

fn read_request(path: &Path) -> Result<BridgeRequest, RequestError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
