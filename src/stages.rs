//! The two per-run stages.
//!
//! [`compile`] invokes the compiler once per run; [`execute`] invokes the
//! produced executable once per case. Both return their classified checks as
//! values and never touch aggregate state.

use std::time::Duration;

use crate::process::ExecutionOutcome;

pub mod compile;
pub mod execute;

pub use compile::{compile_run, CompileResult};
pub use execute::execute_case;

/// Human-readable exit status, used in expected/actual lines.
pub(crate) fn describe_exit(outcome: &ExecutionOutcome) -> String {
    match outcome.exit_code {
        Some(code) => code.to_string(),
        None => "terminated by signal".to_string(),
    }
}

pub(crate) fn timeout_message(what: &str, timeout: Option<Duration>) -> String {
    match timeout {
        Some(limit) => format!("{what} timed out after {:.1}s", limit.as_secs_f64()),
        None => format!("{what} timed out"),
    }
}
