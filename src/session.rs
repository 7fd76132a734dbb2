//! The orchestration loop.
//!
//! Groups, runs and cases are processed strictly in specification order, one
//! at a time. Each stage hands back its checks; the session folds them into
//! the group's tally, forwards failures to the reporter, and lets the panic
//! governor decide whether the next group may start.

use tracing::{info, info_span};

use crate::check::StageReport;
use crate::config::RunnerConfig;
use crate::governor::{self, Decision};
use crate::process::Invoker;
use crate::report::{CheckLocation, Reporter};
use crate::selector::TagSelector;
use crate::spec::{Run, TestGroup, TestSuite};
use crate::stages::{compile_run, execute_case};
use crate::tally::{GroupSummary, GroupTally, SessionSummary};

pub struct Session<'a, I: Invoker, R: Reporter> {
    config: &'a RunnerConfig,
    invoker: I,
    reporter: R,
}

impl<'a, I: Invoker, R: Reporter> Session<'a, I, R> {
    pub fn new(config: &'a RunnerConfig, invoker: I, reporter: R) -> Self {
        Self {
            config,
            invoker,
            reporter,
        }
    }

    /// Runs every selected group and returns the aggregated summary.
    pub fn run(&mut self, suite: &TestSuite, selector: &TagSelector) -> SessionSummary {
        let mut summary = SessionSummary::default();
        let mut groups = suite.groups.iter();

        for group in groups.by_ref() {
            if !selector.selects(group) {
                summary.deselected += 1;
                continue;
            }
            let (tally, decision) = self.run_group(group);
            summary.groups.push(GroupSummary {
                name: group.name.clone(),
                tally,
                panicked: decision.is_abort(),
            });
            if decision.is_abort() {
                summary.aborted_by = Some(group.name.clone());
                break;
            }
        }

        for group in groups {
            if selector.selects(group) {
                summary.not_reached += 1;
            } else {
                summary.deselected += 1;
            }
        }

        info!(
            groups = summary.groups.len(),
            checks = summary.checks_run(),
            failed = summary.checks_failed(),
            aborted = summary.aborted(),
            "session finished"
        );
        self.reporter.session_finished(&summary);
        summary
    }

    /// Processes one group and asks the governor what happens next.
    pub fn run_group(&mut self, group: &TestGroup) -> (GroupTally, Decision) {
        let _span = info_span!("group", name = %group.name).entered();
        info!(runs = group.runs.len(), "group started");
        self.reporter.group_started(group);

        let mut tally = GroupTally::default();
        for (idx, run) in group.runs.iter().enumerate() {
            self.run_one(idx, run, &mut tally);
        }

        let decision = governor::evaluate(group.panic_threshold, &tally);
        info!(
            run = tally.cases_run,
            passed = tally.cases_passed,
            abort = decision.is_abort(),
            "group finished"
        );
        self.reporter.group_finished(group, &tally, &decision);
        (tally, decision)
    }

    fn run_one(&mut self, idx: usize, run: &Run, tally: &mut GroupTally) {
        let mut ordinal = 0;

        if let Some(spec) = &run.compile {
            self.reporter.compilation_started(run);
            let result = compile_run(&mut self.invoker, self.config, run, spec);
            self.record(idx, &mut ordinal, &result.report, tally);
            if !result.executable_ready {
                return;
            }
        }

        for case in &run.cases {
            let report = execute_case(&mut self.invoker, self.config, run, case);
            self.record(idx, &mut ordinal, &report, tally);
        }
    }

    fn record(&mut self, run: usize, ordinal: &mut usize, report: &StageReport, tally: &mut GroupTally) {
        for check in &report.checks {
            *ordinal += 1;
            tally.record(check);
            if !check.passed() {
                let location = CheckLocation {
                    run,
                    ordinal: *ordinal,
                };
                self.reporter.check_failed(location, &report.command, check);
            }
        }
    }

    pub fn into_parts(self) -> (I, R) {
        (self.invoker, self.reporter)
    }
}
