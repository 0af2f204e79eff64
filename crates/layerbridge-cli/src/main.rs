//! layerbridge - local delegate bridge for layered-image documents.
//!
//! A sandboxed plugin writes `request.json` into a shared data directory;
//! this binary opens the named document, extracts its layer tree (including
//! embedded smart objects), and atomically publishes `result.json`. The same
//! analysis is available as a one-shot subcommand and over local HTTP.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;

use layerbridge_cli::bridge::Executor;
use layerbridge_cli::commands;
use layerbridge_cli::subprocess::{SubprocessConfig, SubprocessRunner, DEFAULT_TIMEOUT_SECS};

/// layerbridge - local delegate bridge for layered-image documents
#[derive(Parser)]
#[command(name = "layerbridge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a document and print its layer tree as JSON to stdout
    Analyze {
        /// Path to the document to analyze
        path: PathBuf,

        /// Directory embedded smart objects are extracted into. Extracted
        /// files accumulate; nothing is cleaned up automatically.
        #[arg(long)]
        extract_dir: Option<PathBuf>,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Watch a data directory for request.json and publish result.json
    Bridge {
        /// Shared data directory holding the request/result file pair
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 200)]
        interval_ms: u64,

        /// Run each analysis in an isolated child process
        #[arg(long)]
        isolate: bool,

        /// Timeout in seconds for isolated analysis processes
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,

        /// Directory embedded smart objects are extracted into. Extracted
        /// files accumulate; nothing is cleaned up automatically.
        #[arg(long)]
        extract_dir: Option<PathBuf>,
    },

    /// Serve the analyze contract over local HTTP (127.0.0.1 only)
    Serve {
        /// Port to bind
        #[arg(long, default_value_t = 5000)]
        port: u16,

        /// Directory embedded smart objects are extracted into. Extracted
        /// files accumulate; nothing is cleaned up automatically.
        #[arg(long)]
        extract_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            extract_dir,
            pretty,
        } => {
            let extract_dir = extract_dir.unwrap_or_else(commands::default_extract_dir);
            commands::run_analyze(&path, &extract_dir, pretty)
        }
        Commands::Bridge {
            data_dir,
            interval_ms,
            isolate,
            timeout_secs,
            extract_dir,
        } => {
            let data_dir = data_dir.unwrap_or_else(commands::default_data_dir);
            let extract_dir = extract_dir.unwrap_or_else(commands::default_extract_dir);
            let executor = if isolate {
                Executor::Isolated(SubprocessRunner::with_config(SubprocessConfig {
                    program: None,
                    timeout: Duration::from_secs(timeout_secs),
                }))
            } else {
                Executor::InProcess
            };
            report(commands::run_bridge(
                data_dir,
                extract_dir,
                Duration::from_millis(interval_ms),
                executor,
            ))
        }
        Commands::Serve { port, extract_dir } => {
            let extract_dir = extract_dir.unwrap_or_else(commands::default_extract_dir);
            report(commands::run_serve(port, extract_dir))
        }
    }
}

fn report(outcome: anyhow::Result<()>) -> ExitCode {
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(source) => {
            eprintln!("{}: {:#}", "error".red(), source);
            ExitCode::FAILURE
        }
    }
}
