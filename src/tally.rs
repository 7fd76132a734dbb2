//! Result aggregation.
//!
//! Stages return their checks as values; the session folds them into a
//! [`GroupTally`] per group and collects finished groups into a
//! [`SessionSummary`].

use serde::Serialize;

use crate::check::Check;

/// Check counts for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupTally {
    pub cases_run: usize,
    pub cases_passed: usize,
}

impl GroupTally {
    pub fn record(&mut self, check: &Check) {
        self.cases_run += 1;
        if check.passed() {
            self.cases_passed += 1;
        }
    }

    pub fn record_all<'a, I>(&mut self, checks: I)
    where
        I: IntoIterator<Item = &'a Check>,
    {
        for check in checks {
            self.record(check);
        }
    }

    pub fn failed(&self) -> usize {
        self.cases_run - self.cases_passed
    }

    /// Fraction of checks that passed; vacuously 1.0 for an empty group.
    pub fn pass_fraction(&self) -> f64 {
        if self.cases_run == 0 {
            return 1.0;
        }
        self.cases_passed as f64 / self.cases_run as f64
    }

    pub fn failure_fraction(&self) -> f64 {
        1.0 - self.pass_fraction()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub name: String,
    #[serde(flatten)]
    pub tally: GroupTally,
    pub panicked: bool,
}

/// Everything a finished session reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub groups: Vec<GroupSummary>,
    /// Groups left out by tag selection.
    pub deselected: usize,
    /// Groups never reached because an earlier group panicked.
    pub not_reached: usize,
    /// Name of the group whose failure rate aborted the session.
    pub aborted_by: Option<String>,
}

impl SessionSummary {
    pub fn checks_run(&self) -> usize {
        self.groups.iter().map(|g| g.tally.cases_run).sum()
    }

    pub fn checks_passed(&self) -> usize {
        self.groups.iter().map(|g| g.tally.cases_passed).sum()
    }

    pub fn checks_failed(&self) -> usize {
        self.checks_run() - self.checks_passed()
    }

    pub fn aborted(&self) -> bool {
        self.aborted_by.is_some()
    }

    /// True when nothing failed and nothing panicked.
    pub fn is_clean(&self) -> bool {
        !self.aborted() && self.checks_failed() == 0
    }
}
