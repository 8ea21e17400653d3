//! Errors raised while resolving an operator tree.

use lae_memory::MemoryError;
use lae_scheduling::SchedulerError;
use thiserror::Error;

use crate::node::NodeKind;

/// Errors that abort a [`LinearAlgebraEngine::run`](crate::LinearAlgebraEngine::run).
#[derive(Debug, Error)]
pub enum EngineError {
    /// An operator had the wrong number of operands.
    #[error("{kind} expects {expected} operand(s), got {found}")]
    Arity {
        /// The operator.
        kind: NodeKind,
        /// Accepted operand count, e.g. `"1"` or `"at least 2"`.
        expected: &'static str,
        /// Actual operand count.
        found: usize,
    },

    /// An operand leaf carried no matrix data.
    #[error("operand {index} of {kind} has no matrix data")]
    MissingData {
        /// The operator.
        kind: NodeKind,
        /// Position of the operand.
        index: usize,
    },

    /// Operand shapes are incompatible for the operator.
    #[error("cannot apply {kind} to shapes {left:?} and {right:?}")]
    ShapeMismatch {
        /// The operator.
        kind: NodeKind,
        /// `(rows, cols)` of the left operand.
        left: (usize, usize),
        /// `(rows, cols)` of the right operand.
        right: (usize, usize),
    },

    /// A node kind that is not an operator was asked to compute.
    #[error("{0} is not an operator")]
    UnsupportedOperator(NodeKind),

    /// A row task returned an error.
    #[error("row {row} failed: {source}")]
    Task {
        /// Row index of the first failing task.
        row: usize,
        /// The underlying error.
        #[source]
        source: MemoryError,
    },

    /// Some row tasks panicked and produced no result.
    #[error("{failed} of {expected} row tasks did not complete")]
    TaskPanicked {
        /// Tasks that did not complete.
        failed: usize,
        /// Tasks submitted.
        expected: usize,
    },

    /// Operand data was rejected by the shared matrix.
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// The scheduler refused work.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
