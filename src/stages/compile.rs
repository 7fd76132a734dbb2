//! Compile stage: one compiler invocation per run.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use super::{describe_exit, timeout_message};
use crate::check::{Check, CheckKind, Failure, StageReport};
use crate::config::{RunnerConfig, KEEP_INTERMEDIATES_FLAG};
use crate::process::{Invocation, Invoker};
use crate::spec::{CompileSpec, Run};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult {
    pub report: StageReport,
    /// Whether the run's cases may execute the artifact.
    pub executable_ready: bool,
}

/// Compiles `run` according to `spec` and classifies the outcome.
///
/// A failed compile, an expected failure and an unexpected success each yield
/// one check and leave the executable untrusted. A clean compile yields one
/// passing check, plus an assembly check when `spec` names expected assembly.
/// The compiler's transient assembly file is removed afterwards in every case.
pub fn compile_run<I: Invoker>(
    invoker: &mut I,
    config: &RunnerConfig,
    run: &Run,
    spec: &CompileSpec,
) -> CompileResult {
    let artifact = config.artifact_path(&run.executable_name);
    let invocation = Invocation::new(config.compiler_path())
        .args(spec.source_files.iter().map(|f| config.resolve(f)))
        .arg("-o")
        .arg(&artifact)
        .arg(KEEP_INTERMEDIATES_FLAG)
        .args(&spec.compiler_args);
    let command = display_command(config, run, spec);

    let (checks, executable_ready) = match invoker.invoke(&invocation) {
        Ok(outcome) if outcome.timed_out => (
            vec![Check::fail(
                CheckKind::Compile,
                Failure::new(timeout_message("Compilation", config.timeout)),
            )],
            false,
        ),
        Ok(outcome) => {
            let succeeded = outcome.exit_code == Some(0);
            match (succeeded, spec.expect_failure) {
                (false, false) => {
                    let mut failure = Failure::new(format!(
                        "Compilation failed with errorstatus {}",
                        describe_exit(&outcome)
                    ));
                    failure.transcript = outcome.captured_stdout;
                    (vec![Check::fail(CheckKind::Compile, failure)], false)
                }
                (false, true) => (vec![Check::pass(CheckKind::Compile)], false),
                (true, true) => (
                    vec![Check::fail(
                        CheckKind::Compile,
                        Failure::new("Compilation succeeded when it should have failed"),
                    )],
                    false,
                ),
                (true, false) => {
                    let mut checks = vec![Check::pass(CheckKind::Compile)];
                    if let Some(expected) = &spec.expected_assembly_file {
                        checks.push(compare_assembly(
                            &config.resolve(expected),
                            &config.asm_artifact,
                        ));
                    }
                    (checks, true)
                }
            }
        }
        Err(err) => (
            vec![Check::fail(
                CheckKind::Compile,
                Failure::new(format!("Could not run the compiler: {err}")),
            )],
            false,
        ),
    };

    remove_assembly_artifact(&config.asm_artifact);
    debug!(exec = %run.executable_name, executable_ready, "compile classified");

    CompileResult {
        report: StageReport { command, checks },
        executable_ready,
    }
}

/// Byte-for-byte comparison of the emitted assembly with the expected file.
fn compare_assembly(expected: &Path, emitted: &Path) -> Check {
    let expected_bytes = match fs::read(expected) {
        Ok(bytes) => bytes,
        Err(err) => {
            return Check::fail(
                CheckKind::Assembly,
                Failure::new(format!(
                    "Cannot read expected assembly {}: {err}",
                    expected.display()
                )),
            )
        }
    };
    match fs::read(emitted) {
        Ok(bytes) if bytes == expected_bytes => Check::pass(CheckKind::Assembly),
        Ok(_) => Check::fail(
            CheckKind::Assembly,
            Failure::new("Emitted assembly does not match expected assembly")
                .expected_actual(expected.display(), emitted.display()),
        ),
        Err(err) => Check::fail(
            CheckKind::Assembly,
            Failure::new(format!(
                "Compiler did not leave assembly at {}: {err}",
                emitted.display()
            )),
        ),
    }
}

fn remove_assembly_artifact(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(err) = fs::remove_file(path) {
        warn!(path = %path.display(), %err, "failed to delete assembly artifact");
    }
}

/// `speroc a.spr b.spr -o add.exe --nodel -O1`
fn display_command(config: &RunnerConfig, run: &Run, spec: &CompileSpec) -> String {
    let compiler = config
        .compiler
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.compiler.display().to_string());
    let mut parts = vec![compiler];
    parts.extend(spec.source_files.iter().map(|f| f.display().to_string()));
    parts.push("-o".to_string());
    parts.push(run.executable_name.clone());
    parts.push(KEEP_INTERMEDIATES_FLAG.to_string());
    parts.extend(spec.compiler_args.iter().cloned());
    parts.join(" ")
}
