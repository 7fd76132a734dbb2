//! Loading and validating specification documents.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::debug;
use walkdir::WalkDir;

use super::raw::{RawCase, RawCompile, RawGroup, RawRun};
use super::{CompileSpec, Run, TestCase, TestGroup, TestSuite, DEFAULT_PANIC_THRESHOLD};
use crate::errors::{ConformError, Result};

/// Loads the suite at `path`.
///
/// A file is parsed as a single document. A directory is searched recursively
/// for `.yaml`/`.yml` files, which are loaded in path order and merged.
pub fn load_suite(path: &Path) -> Result<TestSuite> {
    let files = if path.is_dir() {
        discover_yaml_files(path)
    } else {
        vec![path.to_path_buf()]
    };

    let mut suite = TestSuite::default();
    let mut seen = HashSet::new();
    for file in files {
        let source = fs::read_to_string(&file).map_err(|source| ConformError::SpecIo {
            path: file.clone(),
            source,
        })?;
        let part = parse_suite(&file.display().to_string(), &source)?;
        debug!(file = %file.display(), groups = part.len(), "loaded specification");
        for group in part.groups {
            if !seen.insert(group.name.clone()) {
                return Err(ConformError::malformed(format!(
                    "group `{}` is defined more than once",
                    group.name
                )));
            }
            suite.groups.push(group);
        }
    }
    check_artifact_names(&suite)?;
    Ok(suite)
}

/// Parses one specification document. `name` is only used in diagnostics.
pub fn parse_suite(name: &str, source: &str) -> Result<TestSuite> {
    let document: Value =
        serde_yaml::from_str(source).map_err(|e| ConformError::from_yaml(name, source, e))?;
    let mapping = match document {
        Value::Mapping(mapping) => mapping,
        // An empty document has no groups.
        Value::Null => Mapping::new(),
        _ => {
            return Err(ConformError::malformed_with_help(
                format!("{name}: top level must be a mapping of group names"),
                "write each group as `<name>: { runs: [...] }`",
            ))
        }
    };

    let mut groups = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let name = match key {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => {
                return Err(ConformError::malformed(format!(
                    "group names must be strings, found {other:?}"
                )))
            }
        };
        let raw: RawGroup = serde_yaml::from_value(value).map_err(|e| {
            ConformError::malformed(format!("group `{name}`: {e}"))
        })?;
        groups.push(build_group(name, raw)?);
    }
    Ok(TestSuite { groups })
}

fn build_group(name: String, raw: RawGroup) -> Result<TestGroup> {
    let panic_threshold = raw.panic.unwrap_or(DEFAULT_PANIC_THRESHOLD);
    if !(0.0..=1.0).contains(&panic_threshold) {
        return Err(ConformError::malformed_with_help(
            format!("group `{name}`: panic threshold {panic_threshold} is outside [0, 1]"),
            "`panic` is the highest tolerated failure fraction, e.g. 0.25",
        ));
    }
    let Some(raw_runs) = raw.runs else {
        return Err(ConformError::malformed_with_help(
            format!("group `{name}` has no `runs` sequence"),
            "add `runs: []` if the group is intentionally empty",
        ));
    };

    let runs = raw_runs
        .into_iter()
        .enumerate()
        .map(|(idx, run)| build_run(&name, idx, run))
        .collect::<Result<Vec<_>>>()?;

    Ok(TestGroup {
        description: raw.desc.unwrap_or_default(),
        tags: raw.tags.iter().map(|t| t.to_lowercase()).collect::<BTreeSet<_>>(),
        panic_threshold,
        runs,
        name,
    })
}

fn build_run(group: &str, idx: usize, raw: RawRun) -> Result<Run> {
    if raw.exec.trim().is_empty() {
        return Err(ConformError::malformed(format!(
            "group `{group}`, run {idx}: `exec` must name an executable"
        )));
    }
    let cases = raw
        .tests
        .into_iter()
        .enumerate()
        .map(|(case_idx, case)| build_case(group, idx, case_idx, case))
        .collect::<Result<Vec<_>>>()?;

    Ok(Run {
        executable_name: raw.exec,
        compile: raw.compile.map(build_compile),
        cases,
    })
}

fn build_compile(raw: RawCompile) -> CompileSpec {
    CompileSpec {
        source_files: raw.files,
        compiler_args: raw.args,
        expect_failure: raw.fail,
        expected_assembly_file: raw.asm,
    }
}

fn build_case(group: &str, run: usize, idx: usize, raw: RawCase) -> Result<TestCase> {
    let case = TestCase {
        args: raw.args,
        expected_return_code: raw.return_code,
        expected_output_file: raw.output,
        expect_failure: raw.fail,
    };
    if !case.has_success_metric() {
        return Err(ConformError::malformed_with_help(
            format!("group `{group}`, run {run}, test {idx}: no success metric defined"),
            "give the test a `return` code, an `output` file, or both",
        ));
    }
    Ok(case)
}

/// Two runs compiling to the same executable would overwrite each other's
/// artifact within one session.
fn check_artifact_names(suite: &TestSuite) -> Result<()> {
    let mut owners: Vec<(&str, &str)> = Vec::new();
    for group in &suite.groups {
        for run in group.runs.iter().filter(|r| r.compile.is_some()) {
            if let Some((_, first)) = owners.iter().find(|(exec, _)| *exec == run.executable_name) {
                return Err(ConformError::malformed_with_help(
                    format!(
                        "executable `{}` is compiled by more than one run (groups `{first}` and `{}`)",
                        run.executable_name, group.name
                    ),
                    "give every compiled run its own `exec` name",
                ));
            }
            owners.push((run.executable_name.as_str(), group.name.as_str()));
        }
    }
    Ok(())
}

/// Finds all YAML files under `root`, sorted by path.
pub fn discover_yaml_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
arith:
  tags: [Smoke, fast]
  desc: integer arithmetic
  panic: 0.5
  runs:
    - exec: add.exe
      compile:
        files: [add.spr]
        args: [-O1]
      tests:
        - args: [1, 2]
          return: 3
        - output: add.out
          fail: true
    - exec: prebuilt.exe
      tests:
        - return: 0
parse:
  runs: []
"#;

    #[test]
    fn defaults_are_filled_in_document_order() {
        let suite = parse_suite("tests.yaml", SAMPLE).unwrap();
        let names: Vec<_> = suite.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["arith", "parse"]);

        let arith = suite.group("arith").unwrap();
        assert_eq!(arith.description, "integer arithmetic");
        assert!(arith.tags.contains("smoke"));
        assert_eq!(arith.panic_threshold, 0.5);

        let compile = arith.runs[0].compile.as_ref().unwrap();
        assert_eq!(compile.source_files, vec![PathBuf::from("add.spr")]);
        assert_eq!(compile.compiler_args, vec!["-O1"]);
        assert!(!compile.expect_failure);
        assert!(compile.expected_assembly_file.is_none());

        assert_eq!(arith.runs[0].cases[0].args, vec!["1", "2"]);
        assert!(arith.runs[0].cases[1].expect_failure);
        assert!(arith.runs[1].compile.is_none());

        let parse = suite.group("parse").unwrap();
        assert_eq!(parse.panic_threshold, DEFAULT_PANIC_THRESHOLD);
        assert!(parse.tags.is_empty());
        assert_eq!(parse.description, "");
    }

    #[test]
    fn missing_runs_is_malformed() {
        let err = parse_suite("t.yaml", "g:\n  desc: nothing\n").unwrap_err();
        assert!(matches!(err, ConformError::MalformedSpec { .. }));
        assert!(err.to_string().contains("no `runs`"));
    }

    #[test]
    fn panic_threshold_must_be_a_fraction() {
        for bad in ["1.5", "-0.1", ".nan"] {
            let doc = format!("g:\n  panic: {bad}\n  runs: []\n");
            let err = parse_suite("t.yaml", &doc).unwrap_err();
            assert!(matches!(err, ConformError::MalformedSpec { .. }), "{bad}");
        }
        assert!(parse_suite("t.yaml", "g:\n  panic: 0\n  runs: []\n").is_ok());
    }

    #[test]
    fn case_without_metric_is_rejected() {
        let doc = "g:\n  runs:\n    - exec: a\n      tests:\n        - args: [x]\n";
        let err = parse_suite("t.yaml", doc).unwrap_err();
        assert!(err.to_string().contains("no success metric"));
    }

    #[test]
    fn syntax_errors_are_reported_as_yaml() {
        let err = parse_suite("t.yaml", "g: [unterminated\n").unwrap_err();
        assert!(matches!(err, ConformError::SpecSyntax { .. }));
    }

    #[test]
    fn top_level_sequence_is_rejected() {
        let err = parse_suite("t.yaml", "- a\n- b\n").unwrap_err();
        assert!(matches!(err, ConformError::MalformedSpec { .. }));
    }

    #[test]
    fn empty_document_has_no_groups() {
        assert!(parse_suite("t.yaml", "").unwrap().is_empty());
    }

    #[test]
    fn duplicate_compiled_executables_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let doc = "a:\n  runs:\n    - exec: x\n      compile: {files: [x.spr]}\n\
                   b:\n  runs:\n    - exec: x\n      compile: {files: [y.spr]}\n";
        let path = dir.path().join("tests.yaml");
        fs::write(&path, doc).unwrap();
        let err = load_suite(&path).unwrap_err();
        assert!(err.to_string().contains("compiled by more than one run"));
    }

    #[test]
    fn prebuilt_runs_may_reuse_a_compiled_executable() {
        let dir = tempfile::tempdir().unwrap();
        let doc = "a:\n  runs:\n    - exec: x\n      compile: {files: [x.spr]}\n\
                   b:\n  runs:\n    - exec: x\n      tests: [{return: 0}]\n";
        let path = dir.path().join("tests.yaml");
        fs::write(&path, doc).unwrap();
        assert_eq!(load_suite(&path).unwrap().len(), 2);
    }

    #[test]
    fn directories_are_merged_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.yaml"), "second:\n  runs: []\n").unwrap();
        fs::write(dir.path().join("a.yml"), "first:\n  runs: []\n").unwrap();
        fs::write(dir.path().join("nested/c.yaml"), "third:\n  runs: []\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let suite = load_suite(dir.path()).unwrap();
        let names: Vec<_> = suite.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn duplicate_groups_across_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yaml"), "same:\n  runs: []\n").unwrap();
        fs::write(dir.path().join("b.yaml"), "same:\n  runs: []\n").unwrap();
        let err = load_suite(dir.path()).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_suite(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConformError::SpecIo { .. }));
    }
}
