//! Defines the command-line arguments for the Conform CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use termcolor::ColorChoice;

use crate::config::{
    RunnerConfig, DEFAULT_ASM_ARTIFACT, DEFAULT_BASE_DIR, DEFAULT_COMPILER, DEFAULT_OUT_DIR,
    DEFAULT_SPEC_FILE,
};
use crate::selector::TagSelector;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "conform",
    version,
    about = "Compile and run a declarative conformance suite against a compiler."
)]
pub struct ConformArgs {
    /// Specification file (or directory of YAML files), relative to --dir.
    #[arg(short, long, default_value = DEFAULT_SPEC_FILE)]
    pub file: PathBuf,

    /// Skip groups carrying any of the given tags instead of selecting them.
    #[arg(short, long)]
    pub ignore: bool,

    /// Base directory holding the specification, sources and compiler.
    #[arg(short, long, default_value = DEFAULT_BASE_DIR)]
    pub dir: PathBuf,

    /// Artifact directory, relative to --dir.
    #[arg(short, long, default_value = DEFAULT_OUT_DIR)]
    pub out: PathBuf,

    /// Compiler executable, relative to --dir.
    #[arg(long, default_value = DEFAULT_COMPILER)]
    pub compiler: PathBuf,

    /// Assembly file the compiler leaves in the working directory.
    #[arg(long, default_value = DEFAULT_ASM_ARTIFACT)]
    pub asm_artifact: PathBuf,

    /// Kill any compile or test invocation running longer than this many seconds.
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<f64>,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,

    /// Write the session summary as JSON to this path.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Tags selecting (or, with --ignore, excluding) groups. Case-insensitive.
    pub tags: Vec<String>,
}

impl ConformArgs {
    pub fn runner_config(&self) -> RunnerConfig {
        let defaults = RunnerConfig::default();
        RunnerConfig {
            base_dir: self.dir.clone(),
            spec_file: self.file.clone(),
            out_dir: self.out.clone(),
            compiler: self.compiler.clone(),
            asm_artifact: self.asm_artifact.clone(),
            timeout: self
                .timeout
                .filter(|secs| *secs > 0.0)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
            color: if self.no_color {
                ColorChoice::Never
            } else {
                defaults.color
            },
        }
    }

    pub fn selector(&self) -> TagSelector {
        TagSelector::new(&self.tags, self.ignore)
    }
}
