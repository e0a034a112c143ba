//! Crate-wide error type.
//!
//! Only conditions that must stop a run are errors. Degenerate parameter
//! domains are normalised with a warning, and an analysis that lacks
//! replicates reports it through its result value instead.

use crate::param::Assignment;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by sampling, optimization and analysis.
#[derive(Debug, Error)]
pub enum Error {
    /// A required option is missing or out of range.
    ///
    /// Always raised before the first evaluator call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An externally supplied table or list could not be turned into
    /// assignments.
    #[error("malformed input in {source_name} (row {row}): {message}")]
    MalformedInput {
        /// File path or list label the row came from.
        source_name: String,
        /// 1-based row (or record) number; the header of a file is row 1.
        row: usize,
        message: String,
    },

    /// The evaluator failed while running an assignment.
    #[error("evaluation of {assignment} failed: {message}")]
    Evaluation {
        assignment: Assignment,
        message: String,
    },

    /// The evaluator returned without a result for a submitted assignment.
    #[error("evaluator returned no result for {0}")]
    MissingEvaluation(Assignment),

    /// An evaluation result lacks an output the algorithm needs.
    #[error("output '{output}' missing from the result of {assignment}")]
    MissingOutput {
        output: String,
        assignment: Assignment,
    },

    /// Reading or writing a table failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Shorthand for [`Error::Configuration`].
    pub fn config(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    /// Shorthand for [`Error::MalformedInput`].
    pub fn malformed(source_name: impl Into<String>, row: usize, message: impl Into<String>) -> Self {
        Error::MalformedInput {
            source_name: source_name.into(),
            row,
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Evaluation`].
    pub fn evaluation(assignment: Assignment, message: impl Into<String>) -> Self {
        Error::Evaluation {
            assignment,
            message: message.into(),
        }
    }
}
