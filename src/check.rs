//! Classified checks: the unit of work counted by the aggregator.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// What a check verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Compile,
    Assembly,
    ReturnCode,
    Output,
    /// A case that declared no expectation at all.
    Metric,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckKind::Compile => "compile",
            CheckKind::Assembly => "assembly",
            CheckKind::ReturnCode => "return code",
            CheckKind::Output => "output",
            CheckKind::Metric => "success metric",
        };
        f.write_str(name)
    }
}

/// Why a check failed, with enough context to reproduce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    /// Where the observed output was written, for output mismatches.
    pub observed_file: Option<PathBuf>,
    pub diff: Vec<DiffLine>,
    /// Whatever the child printed, when that helps explain the failure.
    pub transcript: Vec<String>,
}

/// One line of an expected-versus-observed comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Same(String),
    Expected(String),
    Actual(String),
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expected: None,
            actual: None,
            observed_file: None,
            diff: Vec::new(),
            transcript: Vec::new(),
        }
    }

    pub fn expected_actual(mut self, expected: impl ToString, actual: impl ToString) -> Self {
        self.expected = Some(expected.to_string());
        self.actual = Some(actual.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail(Failure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub kind: CheckKind,
    pub verdict: Verdict,
}

impl Check {
    pub fn pass(kind: CheckKind) -> Self {
        Self {
            kind,
            verdict: Verdict::Pass,
        }
    }

    pub fn fail(kind: CheckKind, failure: Failure) -> Self {
        Self {
            kind,
            verdict: Verdict::Fail(failure),
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self.verdict, Verdict::Pass)
    }

    pub fn failure(&self) -> Option<&Failure> {
        match &self.verdict {
            Verdict::Fail(failure) => Some(failure),
            Verdict::Pass => None,
        }
    }
}

/// The checks produced by one stage invocation together with the abbreviated
/// command that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub command: String,
    pub checks: Vec<Check>,
}
