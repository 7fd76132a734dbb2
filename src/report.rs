//! Human-readable progress and summary output.
//!
//! The session calls into a [`Reporter`] at fixed points; reporters only
//! observe. [`ConsoleReporter`] renders to any `termcolor` writer, so the same
//! code drives colored stdout and uncolored in-memory buffers.

use std::io::{self, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::warn;

use crate::check::{Check, DiffLine};
use crate::governor::Decision;
use crate::spec::{Run, TestGroup};
use crate::tally::{GroupTally, SessionSummary};

const RULE: &str = "=======================================================";
const SEPARATOR: &str = " --------------------------------------------------";

/// Identifies a check inside its group: run index and 1-based check ordinal
/// within that run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckLocation {
    pub run: usize,
    pub ordinal: usize,
}

pub trait Reporter {
    fn group_started(&mut self, group: &TestGroup);
    fn compilation_started(&mut self, run: &Run);
    fn check_failed(&mut self, location: CheckLocation, command: &str, check: &Check);
    fn group_finished(&mut self, group: &TestGroup, tally: &GroupTally, decision: &Decision);
    fn session_finished(&mut self, summary: &SessionSummary);
}

impl<T: Reporter + ?Sized> Reporter for &mut T {
    fn group_started(&mut self, group: &TestGroup) {
        (**self).group_started(group)
    }
    fn compilation_started(&mut self, run: &Run) {
        (**self).compilation_started(run)
    }
    fn check_failed(&mut self, location: CheckLocation, command: &str, check: &Check) {
        (**self).check_failed(location, command, check)
    }
    fn group_finished(&mut self, group: &TestGroup, tally: &GroupTally, decision: &Decision) {
        (**self).group_finished(group, tally, decision)
    }
    fn session_finished(&mut self, summary: &SessionSummary) {
        (**self).session_finished(summary)
    }
}

pub struct ConsoleReporter<W: WriteColor> {
    out: W,
}

impl ConsoleReporter<StandardStream> {
    pub fn stdout(color: ColorChoice) -> Self {
        Self::new(StandardStream::stdout(color))
    }
}

impl<W: WriteColor> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, render: impl FnOnce(&mut W) -> io::Result<()>) {
        let result = render(&mut self.out).and_then(|()| self.out.flush());
        // Restore default colors even if rendering stopped half-way.
        let _ = self.out.reset();
        if let Err(err) = result {
            warn!(%err, "failed to write report output");
        }
    }
}

impl<W: WriteColor> Reporter for ConsoleReporter<W> {
    fn group_started(&mut self, group: &TestGroup) {
        self.emit(|out| {
            out.set_color(ColorSpec::new().set_bold(true))?;
            writeln!(out, "Running Test Group \"{}\"", capitalize(&group.name))?;
            out.reset()?;
            writeln!(out, "  - Testing {}", group.description)?;
            writeln!(out, "{RULE}")
        });
    }

    fn compilation_started(&mut self, run: &Run) {
        self.emit(|out| writeln!(out, "Compilation: {}", run.executable_name));
    }

    fn check_failed(&mut self, location: CheckLocation, command: &str, check: &Check) {
        let Some(failure) = check.failure() else {
            return;
        };
        self.emit(|out| {
            writeln!(out, " [{}:{}]: {}", location.run, location.ordinal, command)?;
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
            writeln!(out, "    {}", failure.message)?;
            out.reset()?;
            if let (Some(expected), Some(actual)) = (&failure.expected, &failure.actual) {
                writeln!(out, "     Expected: {expected}  =>  Actual: {actual}")?;
            }
            if let Some(path) = &failure.observed_file {
                writeln!(out, "    See file {} for actual output", path.display())?;
            }
            for line in &failure.diff {
                write_diff_line(out, line)?;
            }
            for line in &failure.transcript {
                writeln!(out, "    | {line}")?;
            }
            writeln!(out, "{SEPARATOR}")
        });
    }

    fn group_finished(&mut self, group: &TestGroup, tally: &GroupTally, decision: &Decision) {
        self.emit(|out| {
            writeln!(out, "  - Report for Test Group \"{}\"", capitalize(&group.name))?;
            if tally.cases_run == 0 {
                writeln!(out, "   No checks were run")?;
            } else {
                let color = if tally.failed() == 0 { Color::Green } else { Color::Red };
                out.set_color(ColorSpec::new().set_fg(Some(color)))?;
                writeln!(
                    out,
                    "   {} cases out of {} possible failed | {} passed",
                    tally.failed(),
                    tally.cases_run,
                    tally.cases_passed
                )?;
                out.reset()?;
            }
            if let Decision::Abort {
                tolerance,
                failure_rate,
            } = decision
            {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
                writeln!(
                    out,
                    "   Panic: {}% of tests must pass out of this group",
                    percent(1.0 - tolerance)
                )?;
                writeln!(
                    out,
                    "     Stopping due to {}% test failure rate",
                    percent(*failure_rate)
                )?;
                out.reset()?;
            }
            writeln!(out, "{RULE}")?;
            writeln!(out)?;
            writeln!(out)
        });
    }

    fn session_finished(&mut self, summary: &SessionSummary) {
        self.emit(|out| {
            out.set_color(ColorSpec::new().set_bold(true))?;
            write!(out, "Summary:")?;
            out.reset()?;
            writeln!(
                out,
                " {} groups run, {} deselected, {} not reached",
                summary.groups.len(),
                summary.deselected,
                summary.not_reached
            )?;
            let color = if summary.is_clean() { Color::Green } else { Color::Red };
            out.set_color(ColorSpec::new().set_fg(Some(color)))?;
            writeln!(
                out,
                "   {} checks, {} failed, {} passed",
                summary.checks_run(),
                summary.checks_failed(),
                summary.checks_passed()
            )?;
            out.reset()?;
            if let Some(group) = &summary.aborted_by {
                writeln!(out, "   Aborted after group \"{}\"", capitalize(group))?;
            }
            Ok(())
        });
    }
}

fn write_diff_line<W: WriteColor>(out: &mut W, line: &DiffLine) -> io::Result<()> {
    match line {
        DiffLine::Same(text) => writeln!(out, "        {text}"),
        DiffLine::Expected(text) => {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            writeln!(out, "      - expected: {text}")?;
            out.reset()
        }
        DiffLine::Actual(text) => {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
            writeln!(out, "      + actual:   {text}")?;
            out.reset()
        }
    }
}

/// Upper-cases the first character and lower-cases the rest.
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Percentage with at most two decimals: 0.5 -> "50", 1/3 -> "33.33".
fn percent(fraction: f64) -> String {
    let text = format!("{:.2}", fraction * 100.0);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use termcolor::Buffer;

    use super::*;
    use crate::check::{CheckKind, Failure};

    fn reporter() -> ConsoleReporter<Buffer> {
        ConsoleReporter::new(Buffer::no_color())
    }

    fn text(reporter: ConsoleReporter<Buffer>) -> String {
        String::from_utf8(reporter.into_inner().into_inner()).unwrap()
    }

    fn group() -> TestGroup {
        TestGroup {
            name: "arith".into(),
            description: "integer arithmetic".into(),
            tags: Default::default(),
            panic_threshold: 0.5,
            runs: Vec::new(),
        }
    }

    #[test]
    fn group_header_is_capitalized() {
        let mut r = reporter();
        r.group_started(&group());
        let out = text(r);
        assert!(out.starts_with("Running Test Group \"Arith\"\n  - Testing integer arithmetic\n"));
    }

    #[test]
    fn failure_lines_carry_location_and_values() {
        let mut r = reporter();
        let mut failure = Failure::new("Execution failed with incorrect return value")
            .expected_actual(0, 3);
        failure.observed_file = Some(PathBuf::from("_test/a.out.observed"));
        failure.diff = vec![DiffLine::Expected("hi".into()), DiffLine::Actual("ho".into())];
        r.check_failed(
            CheckLocation { run: 0, ordinal: 2 },
            "add.exe 1 2",
            &Check::fail(CheckKind::ReturnCode, failure),
        );
        let out = text(r);
        assert!(out.contains(" [0:2]: add.exe 1 2\n"));
        assert!(out.contains("     Expected: 0  =>  Actual: 3\n"));
        assert!(out.contains("See file _test/a.out.observed for actual output"));
        assert!(out.contains("- expected: hi"));
        assert!(out.contains("+ actual:   ho"));
    }

    #[test]
    fn passing_checks_print_nothing() {
        let mut r = reporter();
        r.check_failed(
            CheckLocation { run: 0, ordinal: 1 },
            "x",
            &Check::pass(CheckKind::Compile),
        );
        assert!(text(r).is_empty());
    }

    #[test]
    fn group_summary_counts_and_panic() {
        let mut r = reporter();
        let tally = GroupTally {
            cases_run: 4,
            cases_passed: 1,
        };
        let decision = Decision::Abort {
            tolerance: 0.5,
            failure_rate: 0.75,
        };
        r.group_finished(&group(), &tally, &decision);
        let out = text(r);
        assert!(out.contains("   3 cases out of 4 possible failed | 1 passed\n"));
        assert!(out.contains("Panic: 50% of tests must pass"));
        assert!(out.contains("Stopping due to 75% test failure rate"));
    }

    #[test]
    fn percentages_trim_trailing_zeros() {
        assert_eq!(percent(0.5), "50");
        assert_eq!(percent(1.0 / 3.0), "33.33");
        assert_eq!(percent(0.125), "12.5");
        assert_eq!(percent(0.0), "0");
    }

    #[test]
    fn capitalize_matches_title_style() {
        assert_eq!(capitalize("arith"), "Arith");
        assert_eq!(capitalize("PARSER"), "Parser");
        assert_eq!(capitalize(""), "");
    }
}
