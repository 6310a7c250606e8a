//! Error types for the routing engine.
//!
//! This module defines the single error taxonomy used across loaders, the
//! consistency checker, the solver, and the I/O adapters. Every variant
//! carries enough context (a file path, a field name, or a pair of reach
//! identifiers) to produce the single-line, file/field-naming diagnostic
//! that the CLI driver prints.

use std::fmt;

/// The error taxonomy for the routing engine.
///
/// Each variant corresponds to one of the categories a fatal failure can
/// fall into. The CLI driver matches on this enum to pick an exit code and
/// to prefix the user-visible message with `"ERROR - "`.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteError {
    /// A file could not be read, a required field/dimension/variable was
    /// missing, two arrays had mismatched lengths, or reach identifiers
    /// were reordered between two sources that must agree.
    InvalidInput {
        /// The file or variable this error is about.
        source: String,
        /// A descriptive message about what went wrong.
        message: String,
    },

    /// The sub-basin is not sorted upstream-before-downstream.
    TopologyError {
        /// The offending downstream reach identifier.
        downstream: u32,
        /// The offending upstream reach identifier.
        upstream: u32,
    },

    /// The routing sub-step does not evenly divide the forcing step, the
    /// sub-step is non-positive, or a required configuration key is missing.
    ConfigError {
        /// A descriptive message about the configuration problem.
        message: String,
    },

    /// The forward substitution encountered a zero (or otherwise invalid)
    /// diagonal entry, or produced a non-finite value.
    SolverError {
        /// A descriptive message about the solver failure.
        message: String,
    },

    /// An output dataset could not be created or written.
    IOError {
        /// The output path this error is about.
        path: String,
        /// A descriptive message about the I/O failure.
        message: String,
    },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::InvalidInput { source, message } => {
                write!(f, "invalid input in '{}': {}", source, message)
            }
            RouteError::TopologyError { downstream, upstream } => {
                write!(
                    f,
                    "sorting problem: {} is downstream of {} but is located above it in the basin file",
                    downstream, upstream
                )
            }
            RouteError::ConfigError { message } => {
                write!(f, "configuration error: {}", message)
            }
            RouteError::SolverError { message } => {
                write!(f, "solver error: {}", message)
            }
            RouteError::IOError { path, message } => {
                write!(f, "I/O error writing '{}': {}", path, message)
            }
        }
    }
}

impl std::error::Error for RouteError {}

/// Emits the single user-visible `"ERROR - "` line required by the error
/// handling contract, and mirrors it as a structured log record at `error`
/// severity.
pub fn report_error(err: &RouteError) {
    log::error!("{}", err);
    eprintln!("ERROR - {}", err);
}

/// Emits the single user-visible `"WARNING - "` line for a non-fatal
/// condition, and mirrors it as a structured log record at `warn` severity.
pub fn report_warning(message: &str) {
    log::warn!("{}", message);
    eprintln!("WARNING - {}", message);
}

pub type RouteResult<T> = Result<T, RouteError>;
