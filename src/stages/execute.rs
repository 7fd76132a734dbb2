//! Execution stage: one invocation of the run's executable per case.

use std::fs;
use std::path::{Path, PathBuf};

use difference::{Changeset, Difference};
use tracing::warn;

use super::{describe_exit, timeout_message};
use crate::check::{Check, CheckKind, DiffLine, Failure, StageReport};
use crate::config::{observed_output_path, RunnerConfig};
use crate::process::{ExecutionOutcome, Invocation, Invoker};
use crate::spec::{Run, TestCase};

/// Longest diff attached to an output failure.
const MAX_DIFF_LINES: usize = 20;

/// Runs one case and performs each check it asks for: a return-code check,
/// an output check, or both.
pub fn execute_case<I: Invoker>(
    invoker: &mut I,
    config: &RunnerConfig,
    run: &Run,
    case: &TestCase,
) -> StageReport {
    let command = display_command(run, case);
    if !case.has_success_metric() {
        return StageReport {
            command,
            checks: vec![Check::fail(
                CheckKind::Metric,
                Failure::new("No success metric defined for this test"),
            )],
        };
    }

    let invocation =
        Invocation::new(config.artifact_path(&run.executable_name)).args(&case.args);
    let outcome = match invoker.invoke(&invocation) {
        Ok(outcome) if outcome.timed_out => {
            let message = timeout_message("Execution", config.timeout);
            return fail_all(command, case, &message);
        }
        Ok(outcome) => outcome,
        Err(err) => {
            let message = format!("Could not run {}: {err}", run.executable_name);
            return fail_all(command, case, &message);
        }
    };

    let mut checks = Vec::with_capacity(2);
    if let Some(expected) = case.expected_return_code {
        checks.push(check_return_code(expected, case.expect_failure, &outcome));
    }
    if let Some(expected_file) = &case.expected_output_file {
        checks.push(check_output(
            &config.resolve(expected_file),
            case.expect_failure,
            &outcome,
        ));
    }
    StageReport { command, checks }
}

fn check_return_code(expected: i32, expect_failure: bool, outcome: &ExecutionOutcome) -> Check {
    let matched = outcome.exit_code == Some(expected);
    match (matched, expect_failure) {
        (true, false) | (false, true) => Check::pass(CheckKind::ReturnCode),
        (false, false) => Check::fail(
            CheckKind::ReturnCode,
            Failure::new("Execution failed with incorrect return value")
                .expected_actual(expected, describe_exit(outcome)),
        ),
        (true, true) => Check::fail(
            CheckKind::ReturnCode,
            Failure::new("Execution succeeded when it should have failed")
                .expected_actual(expected, describe_exit(outcome)),
        ),
    }
}

fn check_output(expected_file: &Path, expect_failure: bool, outcome: &ExecutionOutcome) -> Check {
    let expected = match fs::read_to_string(expected_file) {
        Ok(text) => text.lines().map(str::to_owned).collect::<Vec<_>>(),
        Err(err) => {
            return Check::fail(
                CheckKind::Output,
                Failure::new(format!(
                    "Cannot read expected output {}: {err}",
                    expected_file.display()
                )),
            )
        }
    };
    let matched = prefix_matches(&expected, &outcome.captured_stdout);

    match (matched, expect_failure) {
        (true, false) | (false, true) => Check::pass(CheckKind::Output),
        (false, false) => {
            let mut failure = Failure::new("Execution failed to match expected output");
            failure.diff = line_diff(&expected, &outcome.captured_stdout);
            failure.observed_file = write_observed(expected_file, &outcome.captured_stdout);
            Check::fail(CheckKind::Output, failure)
        }
        (true, true) => Check::fail(
            CheckKind::Output,
            Failure::new("Execution matched expected output when it should have failed"),
        ),
    }
}

/// Every expected line must appear at the same index of the captured output.
/// Captured lines past the end of the expectation are not compared.
pub fn prefix_matches(expected: &[String], captured: &[String]) -> bool {
    expected.len() <= captured.len() && expected.iter().zip(captured).all(|(e, c)| e == c)
}

/// Diff of the compared region: the expected lines against the same number of
/// captured lines.
fn line_diff(expected: &[String], captured: &[String]) -> Vec<DiffLine> {
    let compared = &captured[..captured.len().min(expected.len())];
    let changeset = Changeset::new(&expected.join("\n"), &compared.join("\n"), "\n");
    let mut lines = Vec::new();
    for diff in changeset.diffs {
        let (text, wrap): (String, fn(String) -> DiffLine) = match diff {
            Difference::Same(text) => (text, DiffLine::Same),
            Difference::Rem(text) => (text, DiffLine::Expected),
            Difference::Add(text) => (text, DiffLine::Actual),
        };
        lines.extend(text.split('\n').map(|line| wrap(line.to_string())));
    }
    lines.truncate(MAX_DIFF_LINES);
    lines
}

/// Dumps the captured output next to the expected file. Returns the path on success.
fn write_observed(expected_file: &Path, captured: &[String]) -> Option<PathBuf> {
    let path = observed_output_path(expected_file);
    let mut contents = captured.join("\n");
    if !captured.is_empty() {
        contents.push('\n');
    }
    match fs::write(&path, contents) {
        Ok(()) => Some(path),
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to write observed output");
            None
        }
    }
}

fn fail_all(command: String, case: &TestCase, message: &str) -> StageReport {
    let mut checks = Vec::with_capacity(2);
    if case.expected_return_code.is_some() {
        checks.push(Check::fail(CheckKind::ReturnCode, Failure::new(message)));
    }
    if case.expected_output_file.is_some() {
        checks.push(Check::fail(CheckKind::Output, Failure::new(message)));
    }
    StageReport { command, checks }
}

/// `add.exe 1 2`
fn display_command(run: &Run, case: &TestCase) -> String {
    std::iter::once(run.executable_name.as_str())
        .chain(case.args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
