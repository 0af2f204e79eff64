//! CLI command implementations.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::bridge::{Bridge, Executor};
use crate::pipeline;
use crate::server;

/// Default shared data directory for the file bridge.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("layerbridge")
}

/// Default directory embedded smart objects are extracted into.
pub fn default_extract_dir() -> PathBuf {
    default_data_dir().join("extracted")
}

/// `layerbridge analyze`: prints the layer array to stdout per the
/// subprocess contract: a JSON array on success, `{"error": ...}` plus a
/// non-zero exit on failure. Output is UTF-8 with non-ASCII characters
/// emitted literally.
pub fn run_analyze(path: &Path, extract_dir: &Path, pretty: bool) -> ExitCode {
    match pipeline::analyze_document(path, extract_dir) {
        Ok(layers) => {
            let serialized = if pretty {
                serde_json::to_string_pretty(&layers)
            } else {
                serde_json::to_string(&layers)
            };
            match serialized {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::SUCCESS
                }
                Err(source) => emit_error(format!("Failed to serialize layer records: {source}")),
            }
        }
        Err(source) => emit_error(source.to_string()),
    }
}

/// `layerbridge bridge`: runs the file-poll loop until killed.
pub fn run_bridge(
    data_dir: PathBuf,
    extract_dir: PathBuf,
    interval: Duration,
    executor: Executor,
) -> Result<()> {
    let bridge = Bridge::new(data_dir, extract_dir, executor).with_interval(interval);
    bridge.run().context("bridge loop failed to start")?;
    Ok(())
}

/// `layerbridge serve`: runs the HTTP delegate until killed.
pub fn run_serve(port: u16, extract_dir: PathBuf) -> Result<()> {
    server::serve(port, extract_dir)
        .with_context(|| format!("HTTP delegate on port {port} failed"))?;
    Ok(())
}

/// Errors go to stdout as `{"error": ...}` with a non-zero exit, per the
/// subprocess CLI contract.
fn emit_error(message: String) -> ExitCode {
    println!("{}", serde_json::json!({ "error": message }));
    ExitCode::FAILURE
}
