//! Errors raised by shared vectors and matrices.

use thiserror::Error;

use crate::orientation::Orientation;

/// Errors that can occur while reading or mutating shared storage.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// An index was outside `[0, len)`.
    #[error("index {index} is out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// The length that was indexed.
        len: usize,
    },

    /// Two vectors with different orientations were combined.
    #[error("vectors must share an orientation ({left} vs {right})")]
    OrientationMismatch {
        /// Orientation of the receiving vector.
        left: Orientation,
        /// Orientation of the argument vector.
        right: Orientation,
    },

    /// Two vectors with different lengths were combined.
    #[error("vectors must have the same length ({left} vs {right})")]
    LengthMismatch {
        /// Length of the receiving vector.
        left: usize,
        /// Length of the argument vector.
        right: usize,
    },

    /// A vector was multiplied by a matrix with no vectors.
    #[error("cannot multiply by an empty matrix")]
    EmptyMatrix,

    /// A vector's length did not match the row count of the matrix it multiplies.
    #[error("vector of length {found} cannot multiply a matrix with {expected} rows")]
    DimensionMismatch {
        /// Row count of the matrix.
        expected: usize,
        /// Length of the vector.
        found: usize,
    },

    /// Input rows did not all have the same length.
    #[error("matrix must be rectangular: row {row} has {found} entries, expected {expected}")]
    NotRectangular {
        /// Index of the first ragged row.
        row: usize,
        /// Length of row 0.
        expected: usize,
        /// Length of the ragged row.
        found: usize,
    },
}

/// Result type for shared storage operations.
pub type Result<T> = std::result::Result<T, MemoryError>;
