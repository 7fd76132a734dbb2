//! Conform error handling.
//!
//! Every failure that can stop a session before it starts (unreadable or
//! malformed specification, output directory problems, report I/O) is a
//! [`ConformError`]. Problems with a single compile or case invocation are
//! never surfaced here: the stages classify them as failed checks instead.

use std::io;
use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = ConformError> = std::result::Result<T, E>;

#[derive(Error, Diagnostic, Debug)]
pub enum ConformError {
    #[error("failed to read specification {}", path.display())]
    #[diagnostic(code(conform::spec::io))]
    SpecIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("specification is not valid YAML: {message}")]
    #[diagnostic(code(conform::spec::yaml))]
    SpecSyntax {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("malformed specification: {message}")]
    #[diagnostic(code(conform::spec::malformed))]
    MalformedSpec {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("failed to prepare output directory {}", path.display())]
    #[diagnostic(
        code(conform::io::output_dir),
        help("check that the base directory exists and is writable")
    )]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch {program}")]
    #[diagnostic(code(conform::io::spawn))]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed while waiting for {program}")]
    #[diagnostic(code(conform::io::wait))]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write report {}", path.display())]
    #[diagnostic(code(conform::io::report))]
    Report {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl ConformError {
    /// Builds a malformed-specification error without a help message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedSpec {
            message: message.into(),
            help: None,
        }
    }

    /// Builds a malformed-specification error with a help message.
    pub fn malformed_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::MalformedSpec {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Converts a `serde_yaml` error into a diagnostic pointing into `source`.
    pub fn from_yaml(name: &str, source: &str, error: serde_yaml::Error) -> Self {
        let span = error
            .location()
            .map(|loc| SourceSpan::from((loc.index().min(source.len()), 0)));
        Self::SpecSyntax {
            message: error.to_string(),
            src: NamedSource::new(name, source.to_string()),
            span,
        }
    }
}

/// Renders an error through miette on stderr.
pub fn print_error(error: ConformError) {
    let report = Report::new(error);
    eprintln!("{report:?}");
}
