//! The Conform Command-Line Interface.
//!
//! Loads the specification, prepares the artifact directory, runs the session
//! and maps the outcome onto the process exit status.

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use crate::cli::args::ConformArgs;
use crate::errors::{print_error, ConformError, Result};
use crate::process::ProcessInvoker;
use crate::report::ConsoleReporter;
use crate::session::Session;
use crate::spec::load_suite;
use crate::tally::SessionSummary;

pub mod args;

/// Every selected group ran, nothing failed, nothing panicked.
pub const EXIT_CLEAN: u8 = 0;
/// At least one check failed or a group panicked.
pub const EXIT_FAILURES: u8 = 1;
/// The session could not start.
pub const EXIT_ERROR: u8 = 2;

/// The main entry point for the CLI.
pub fn run() -> ExitCode {
    let args = ConformArgs::parse();
    match run_with(&args) {
        Ok(summary) if summary.is_clean() => ExitCode::from(EXIT_CLEAN),
        Ok(_) => ExitCode::from(EXIT_FAILURES),
        Err(e) => {
            print_error(e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Runs a whole session for already-parsed arguments.
pub fn run_with(args: &ConformArgs) -> Result<SessionSummary> {
    let config = args.runner_config();
    let suite = load_suite(&config.spec_path())?;
    info!(groups = suite.len(), spec = %config.spec_path().display(), "specification loaded");
    config.prepare_artifact_dir()?;

    let invoker = ProcessInvoker::new(config.timeout);
    let reporter = ConsoleReporter::stdout(config.color);
    let mut session = Session::new(&config, invoker, reporter);
    let summary = session.run(&suite, &args.selector());

    if let Some(path) = &args.report {
        write_report(path, &summary)?;
    }
    Ok(summary)
}

fn write_report(path: &Path, summary: &SessionSummary) -> Result<()> {
    let to_err = |source: Box<dyn std::error::Error + Send + Sync>| ConformError::Report {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_string_pretty(summary).map_err(|e| to_err(e.into()))?;
    fs::write(path, json + "\n").map_err(|e| to_err(e.into()))
}
