//! Resolved runner configuration.
//!
//! `RunnerConfig` owns every path decision: where the specification, sources,
//! expected files and the compiler live (all relative to the base directory),
//! where artifacts are written, and which transient assembly file the compiler
//! leaves behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use termcolor::ColorChoice;

use crate::errors::{ConformError, Result};

pub const DEFAULT_BASE_DIR: &str = "_test";
pub const DEFAULT_SPEC_FILE: &str = "tests.yaml";
pub const DEFAULT_OUT_DIR: &str = "tmp";
pub const DEFAULT_COMPILER: &str = "speroc";
pub const DEFAULT_ASM_ARTIFACT: &str = "out.s";
/// Passed to every compile so the compiler keeps its intermediate files.
pub const KEEP_INTERMEDIATES_FLAG: &str = "--nodel";
/// Suffix appended to an expected-output path for the observed-output dump.
pub const OBSERVED_SUFFIX: &str = "observed";

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub base_dir: PathBuf,
    pub spec_file: PathBuf,
    pub out_dir: PathBuf,
    pub compiler: PathBuf,
    pub asm_artifact: PathBuf,
    pub timeout: Option<Duration>,
    pub color: ColorChoice,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            spec_file: PathBuf::from(DEFAULT_SPEC_FILE),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            compiler: PathBuf::from(DEFAULT_COMPILER),
            asm_artifact: PathBuf::from(DEFAULT_ASM_ARTIFACT),
            timeout: None,
            color: if atty::is(atty::Stream::Stdout) {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            },
        }
    }
}

impl RunnerConfig {
    /// A configuration rooted at `base_dir` with all other defaults.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn spec_path(&self) -> PathBuf {
        self.base_dir.join(&self.spec_file)
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.base_dir.join(&self.out_dir)
    }

    pub fn artifact_path(&self, executable: &str) -> PathBuf {
        self.artifact_dir().join(executable)
    }

    pub fn compiler_path(&self) -> PathBuf {
        self.base_dir.join(&self.compiler)
    }

    /// Sources and expected files are written relative to the base directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }

    /// Creates the artifact directory if it does not exist yet.
    pub fn prepare_artifact_dir(&self) -> Result<PathBuf> {
        let dir = self.artifact_dir();
        fs::create_dir_all(&dir).map_err(|source| ConformError::OutputDir {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }
}

/// `expected.out` -> `expected.out.observed`.
pub fn observed_output_path(expected: &Path) -> PathBuf {
    let mut name = expected.as_os_str().to_owned();
    name.push(".");
    name.push(OBSERVED_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_resolve_under_the_base_dir() {
        let config = RunnerConfig::with_base_dir("_t");
        assert_eq!(config.spec_path(), PathBuf::from("_t/tests.yaml"));
        assert_eq!(config.artifact_path("a.exe"), PathBuf::from("_t/tmp/a.exe"));
        assert_eq!(config.compiler_path(), PathBuf::from("_t/speroc"));
        assert_eq!(config.resolve(Path::new("x/y.spr")), PathBuf::from("_t/x/y.spr"));
        assert_eq!(config.asm_artifact, PathBuf::from("out.s"));
    }

    #[test]
    fn observed_path_keeps_the_expected_name() {
        assert_eq!(
            observed_output_path(Path::new("_t/out/hello.txt")),
            PathBuf::from("_t/out/hello.txt.observed")
        );
    }

    #[test]
    fn artifact_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RunnerConfig::with_base_dir(dir.path());
        config.out_dir = PathBuf::from("nested/tmp");
        let created = config.prepare_artifact_dir().unwrap();
        assert!(created.is_dir());
        // Idempotent.
        assert!(config.prepare_artifact_dir().is_ok());
    }
}
