//! The in-memory test specification.
//!
//! A [`TestSuite`] is an ordered list of [`TestGroup`]s, each owning its
//! [`Run`]s, which in turn own their [`TestCase`]s. The tree is produced once by
//! [`loader::load_suite`] with every default already filled in and is never
//! mutated afterwards.

use std::collections::BTreeSet;
use std::path::PathBuf;

pub mod loader;
pub mod raw;

pub use loader::{load_suite, parse_suite};

/// Failure tolerance used when a group does not declare `panic`.
pub const DEFAULT_PANIC_THRESHOLD: f64 = 1.0;

/// All groups of a specification, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestSuite {
    pub groups: Vec<TestGroup>,
}

impl TestSuite {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[cfg(test)]
    pub fn group(&self, name: &str) -> Option<&TestGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestGroup {
    pub name: String,
    pub description: String,
    /// Lower-cased tag set.
    pub tags: BTreeSet<String>,
    /// Highest tolerated failure fraction, always within `[0, 1]`.
    pub panic_threshold: f64,
    pub runs: Vec<Run>,
}

/// One executable, optionally compiled first, exercised by its cases.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub executable_name: String,
    /// `None` means the executable is already built.
    pub compile: Option<CompileSpec>,
    pub cases: Vec<TestCase>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileSpec {
    pub source_files: Vec<PathBuf>,
    pub compiler_args: Vec<String>,
    pub expect_failure: bool,
    pub expected_assembly_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestCase {
    pub args: Vec<String>,
    pub expected_return_code: Option<i32>,
    pub expected_output_file: Option<PathBuf>,
    pub expect_failure: bool,
}

impl TestCase {
    /// A case without any expectation cannot pass or fail on its own.
    pub fn has_success_metric(&self) -> bool {
        self.expected_return_code.is_some() || self.expected_output_file.is_some()
    }
}
