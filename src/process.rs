//! Blocking child-process invocation.
//!
//! Every compiler and test-binary call goes through an [`Invoker`]. The
//! production [`ProcessInvoker`] spawns a real child with an argument vector
//! (no shell), captures stdout, and optionally kills the child once a timeout
//! expires.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::errors::{ConformError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long stdout may stay open after a timed-out child is gone. A
/// grandchild that inherited the pipe must not hold the session hostage.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// A single program invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Full command line, for logs only.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }
}

/// What a finished child left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// `None` when the child was ended by a signal.
    pub exit_code: Option<i32>,
    pub captured_stdout: Vec<String>,
    pub timed_out: bool,
}

impl ExecutionOutcome {
    pub fn exited(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            ..Self::default()
        }
    }

    pub fn with_stdout<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.captured_stdout = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Runs an invocation to completion.
pub trait Invoker {
    fn invoke(&mut self, invocation: &Invocation) -> Result<ExecutionOutcome>;
}

impl<T: Invoker + ?Sized> Invoker for &mut T {
    fn invoke(&mut self, invocation: &Invocation) -> Result<ExecutionOutcome> {
        (**self).invoke(invocation)
    }
}

/// Spawns real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    timeout: Option<Duration>,
}

impl ProcessInvoker {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Invoker for ProcessInvoker {
    fn invoke(&mut self, invocation: &Invocation) -> Result<ExecutionOutcome> {
        let program = invocation.program.display().to_string();
        debug!(command = %invocation.command_line(), "invoking");

        let mut child = Command::new(command_path(&invocation.program))
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ConformError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Drain stdout on its own thread so a chatty child cannot block on a full pipe.
        let lines = child.stdout.take().map(|stdout| {
            let (tx, rx) = mpsc::channel();
            thread::spawn(move || pump_lines(stdout, &tx));
            rx
        });

        let started_at = Instant::now();
        let (status, timed_out) = loop {
            let polled = child.try_wait().map_err(|source| ConformError::Wait {
                program: program.clone(),
                source,
            })?;
            if let Some(status) = polled {
                break (status, false);
            }
            match self.timeout {
                Some(limit) if started_at.elapsed() >= limit => {
                    let _ = child.kill();
                    let status = child.wait().map_err(|source| ConformError::Wait {
                        program: program.clone(),
                        source,
                    })?;
                    break (status, true);
                }
                _ => thread::sleep(POLL_INTERVAL),
            }
        };

        let drain_deadline = self.timeout.map(|limit| {
            let now = Instant::now();
            if timed_out {
                now + DRAIN_GRACE
            } else {
                (started_at + limit).max(now + DRAIN_GRACE)
            }
        });
        let captured_stdout = lines
            .map(|rx| collect_lines(&rx, drain_deadline))
            .unwrap_or_default();
        debug!(
            %program,
            exit_code = ?status.code(),
            timed_out,
            lines = captured_stdout.len(),
            "finished"
        );

        Ok(ExecutionOutcome {
            exit_code: status.code(),
            captured_stdout,
            timed_out,
        })
    }
}

/// Reads `stdout` to EOF one line at a time. Bytes that are not UTF-8 are
/// replaced rather than ending the capture, and a trailing `\r` is dropped.
fn pump_lines(stdout: impl Read, tx: &Sender<String>) {
    for chunk in BufReader::new(stdout).split(b'\n') {
        match chunk {
            Ok(mut bytes) => {
                if bytes.last() == Some(&b'\r') {
                    bytes.pop();
                }
                // Keep reading after the receiver is gone so the writer never sees a closed pipe.
                let _ = tx.send(String::from_utf8_lossy(&bytes).into_owned());
            }
            Err(err) => {
                warn!(error = %err, "stopped reading child stdout");
                break;
            }
        }
    }
}

/// Gathers captured lines until the pipe closes or `deadline` passes.
fn collect_lines(rx: &Receiver<String>, deadline: Option<Instant>) -> Vec<String> {
    let mut lines = Vec::new();
    loop {
        let next = match deadline {
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(deadline) => {
                rx.recv_timeout(deadline.saturating_duration_since(Instant::now()))
            }
        };
        match next {
            Ok(line) => lines.push(line),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                warn!("stdout still open after the child finished; keeping what was read");
                break;
            }
        }
    }
    lines
}

/// A bare file name would be looked up on `PATH`; anchor it to the working
/// directory instead.
fn command_path(program: &Path) -> PathBuf {
    if program.components().count() == 1 && !program.is_absolute() {
        Path::new(".").join(program)
    } else {
        program.to_path_buf()
    }
}
