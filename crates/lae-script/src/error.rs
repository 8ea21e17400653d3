//! Script errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading a script or writing its outcome.
///
/// `at` fields hold a JSON path such as `$.operands[1][0]`.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The input is not valid JSON, or the output could not be serialized.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A file could not be read or written.
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// The `operator` field named no known operator.
    #[error("unknown operator {symbol:?} at {at}")]
    UnknownOperator {
        /// The symbol found.
        symbol: String,
        /// Location of the node.
        at: String,
    },

    /// An operator object lacks a required field.
    #[error("missing field `{field}` at {at}")]
    MissingField {
        /// Name of the field.
        field: &'static str,
        /// Location of the object.
        at: String,
    },

    /// A matrix element is not a number.
    #[error("expected a number at {at}")]
    InvalidNumber {
        /// Location of the element.
        at: String,
    },

    /// Matrix rows differ in length.
    #[error("row {row} at {at} has {found} elements, expected {expected}")]
    NotRectangular {
        /// Location of the matrix.
        at: String,
        /// Index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },

    /// An operator has an empty operand list.
    #[error("operator {symbol:?} at {at} has no operands")]
    NoOperands {
        /// The operator symbol.
        symbol: String,
        /// Location of the node.
        at: String,
    },

    /// A value of the wrong JSON type.
    #[error("expected {expected} at {at}, found {found}")]
    UnexpectedValue {
        /// What the position accepts.
        expected: &'static str,
        /// JSON type found.
        found: &'static str,
        /// Location of the value.
        at: String,
    },
}

/// Result type for script operations.
pub type Result<T> = std::result::Result<T, ScriptError>;
